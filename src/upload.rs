// 📥 Upload Flow - validate a whole batch, persist only if every reading passed

use crate::error::UploadError;
use crate::reading::{CandidateReading, MeterReading};
use crate::store::ReadingStore;
use crate::validation::{validate, RejectionRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the caller reports back for one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub success: bool,
    pub message: String,
    pub processed: usize,
    pub valid: usize,
    pub invalid: usize,
    pub rejections: BTreeMap<RejectionRule, usize>,

    /// Rows written to the store (empty unless the batch succeeded)
    #[serde(skip)]
    pub stored: Vec<MeterReading>,
}

/// Validate without touching the store's write side
pub fn dry_run<S: ReadingStore + ?Sized>(
    store: &S,
    candidates: &[CandidateReading],
) -> Result<UploadReport, UploadError> {
    let known_account_ids = store.list_known_account_ids()?;
    let outcome = validate(candidates, &known_account_ids);

    Ok(UploadReport {
        success: outcome.all_accepted(),
        message: summary_message(candidates.len(), outcome.accepted_count(), outcome.rejected_count()),
        processed: candidates.len(),
        valid: outcome.accepted_count(),
        invalid: outcome.rejected_count(),
        rejections: outcome.rejections_by_rule(),
        stored: Vec::new(),
    })
}

/// Batch-level all-or-nothing: any rejection means nothing is stored.
pub fn process_batch<S: ReadingStore + ?Sized>(
    store: &S,
    candidates: &[CandidateReading],
) -> Result<UploadReport, UploadError> {
    let known_account_ids = store.list_known_account_ids()?;
    let outcome = validate(candidates, &known_account_ids);

    let mut report = UploadReport {
        success: false,
        message: summary_message(candidates.len(), outcome.accepted_count(), outcome.rejected_count()),
        processed: candidates.len(),
        valid: outcome.accepted_count(),
        invalid: outcome.rejected_count(),
        rejections: outcome.rejections_by_rule(),
        stored: Vec::new(),
    };

    if !outcome.all_accepted() {
        tracing::warn!(
            processed = report.processed,
            valid = report.valid,
            invalid = report.invalid,
            "batch rejected, nothing stored"
        );
        return Ok(report);
    }

    report.stored = store.insert_readings(&outcome.accepted_readings())?;
    report.success = true;
    report.message = format!(
        "Successfully uploaded and processed {} reading(s).",
        candidates.len()
    );

    tracing::info!(processed = report.processed, "batch stored");
    Ok(report)
}

fn summary_message(processed: usize, valid: usize, invalid: usize) -> String {
    format!(
        "Processed {} reading(s), where {} valid and {} invalid.",
        processed, valid, invalid
    )
}

// ============================================================================
// TESTS
// ============================================================================
