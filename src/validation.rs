// ✅ Validation Engine - Four ordered rules over a batch of candidate readings
// Duplicate → Known Account → Value Format → Chronological Order
//
// Every rule is a pure partition of the still-surviving readings into
// kept/rejected. A reading rejected by one rule never reaches the next.

use crate::reading::CandidateReading;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// Exactly five ASCII digits, leading zeros allowed
static READING_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("valid regex"));

// ============================================================================
// REJECTION RULE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionRule {
    /// Same (account, timestamp, value) submitted more than once
    Duplicate,

    /// Account id not present in the account directory
    UnknownAccount,

    /// Value is not exactly five digits
    InvalidFormat,

    /// Account group failed the chronological scan
    OutOfOrder,
}

impl RejectionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionRule::Duplicate => "duplicate",
            RejectionRule::UnknownAccount => "unknown_account",
            RejectionRule::InvalidFormat => "invalid_format",
            RejectionRule::OutOfOrder => "out_of_order",
        }
    }
}

impl fmt::Display for RejectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection<'a> {
    pub reading: &'a CandidateReading,
    pub rule: RejectionRule,
}

/// Result of validating one batch. Holds references into the caller's batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome<'a> {
    /// Survivors of all four rules, in submission order
    pub accepted: Vec<&'a CandidateReading>,

    /// Rejected readings, grouped by the rule that rejected them
    pub rejected: Vec<Rejection<'a>>,
}

impl<'a> ValidationOutcome<'a> {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn total(&self) -> usize {
        self.accepted_count() + self.rejected_count()
    }

    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Owned copies of the accepted readings, ready for persistence
    pub fn accepted_readings(&self) -> Vec<CandidateReading> {
        self.accepted.iter().map(|r| (*r).clone()).collect()
    }

    pub fn rejected_readings(&self) -> Vec<&'a CandidateReading> {
        self.rejected.iter().map(|r| r.reading).collect()
    }

    /// Rejection counts per rule (rules with no rejections are omitted)
    pub fn rejections_by_rule(&self) -> BTreeMap<RejectionRule, usize> {
        let mut counts = BTreeMap::new();
        for rejection in &self.rejected {
            *counts.entry(rejection.rule).or_insert(0) += 1;
        }
        counts
    }
}

// ============================================================================
// RULES
// ============================================================================

/// One rule applied to the current working set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSplit<'a> {
    pub kept: Vec<&'a CandidateReading>,
    pub rejected: Vec<&'a CandidateReading>,
}

impl<'a> RuleSplit<'a> {
    fn partition<F>(readings: Vec<&'a CandidateReading>, keep: F) -> Self
    where
        F: Fn(&'a CandidateReading) -> bool,
    {
        let (kept, rejected) = readings.into_iter().partition(|r| keep(*r));
        RuleSplit { kept, rejected }
    }
}

/// Rule 1: every member of a group sharing (account, timestamp, value) is
/// rejected when the group has more than one member.
pub fn reject_duplicates<'a>(readings: Vec<&'a CandidateReading>) -> RuleSplit<'a> {
    let mut group_sizes: HashMap<_, usize> = HashMap::new();
    for reading in readings.iter().copied() {
        *group_sizes.entry(reading.dedup_key()).or_insert(0) += 1;
    }

    RuleSplit::partition(readings, |r| group_sizes[&r.dedup_key()] == 1)
}

/// Rule 2: the account must exist in the directory snapshot
pub fn reject_unknown_accounts<'a>(
    readings: Vec<&'a CandidateReading>,
    known_account_ids: &HashSet<i64>,
) -> RuleSplit<'a> {
    RuleSplit::partition(readings, |r| known_account_ids.contains(&r.account_id))
}

/// Rule 3: value must be exactly five digits
pub fn reject_invalid_values<'a>(readings: Vec<&'a CandidateReading>) -> RuleSplit<'a> {
    RuleSplit::partition(readings, |r| is_valid_reading_value(&r.raw_value))
}

pub fn is_valid_reading_value(raw_value: &str) -> bool {
    READING_VALUE_RE.is_match(raw_value)
}

/// Rule 4: per account, sort by timestamp ascending and scan. If any reading
/// is strictly later than the one before it, the whole account is rejected.
///
/// Only groups whose readings share a single timestamp survive.
pub fn reject_out_of_order<'a>(readings: Vec<&'a CandidateReading>) -> RuleSplit<'a> {
    let mut groups: HashMap<i64, Vec<&CandidateReading>> = HashMap::new();
    for reading in readings.iter().copied() {
        groups.entry(reading.account_id).or_default().push(reading);
    }

    let mut rejected_accounts = HashSet::new();
    for (account_id, mut group) in groups {
        // stable: submission order breaks timestamp ties
        group.sort_by_key(|r| r.timestamp);

        let out_of_order = group
            .windows(2)
            .any(|pair| pair[1].timestamp > pair[0].timestamp);

        if out_of_order {
            rejected_accounts.insert(account_id);
        }
    }

    RuleSplit::partition(readings, |r| !rejected_accounts.contains(&r.account_id))
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Classify every candidate in the batch as accepted or rejected.
///
/// Pure and total: never fails, never mutates its inputs, and every
/// candidate lands in exactly one partition.
pub fn validate<'a>(
    candidates: &'a [CandidateReading],
    known_account_ids: &HashSet<i64>,
) -> ValidationOutcome<'a> {
    let mut rejected = Vec::new();
    let mut record = |rule: RejectionRule, split: RuleSplit<'a>| {
        if !split.rejected.is_empty() {
            tracing::debug!(rule = %rule, count = split.rejected.len(), "readings rejected");
        }
        rejected.extend(
            split
                .rejected
                .into_iter()
                .map(|reading| Rejection { reading, rule }),
        );
        split.kept
    };

    let survivors = candidates.iter().collect();
    let survivors = record(RejectionRule::Duplicate, reject_duplicates(survivors));
    let survivors = record(
        RejectionRule::UnknownAccount,
        reject_unknown_accounts(survivors, known_account_ids),
    );
    let survivors = record(RejectionRule::InvalidFormat, reject_invalid_values(survivors));
    let accepted = record(RejectionRule::OutOfOrder, reject_out_of_order(survivors));

    ValidationOutcome { accepted, rejected }
}

// ============================================================================
// TESTS
// ============================================================================
