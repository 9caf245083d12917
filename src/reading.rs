// 📟 Reading Model - Candidate readings and persisted meter readings
// Candidates are what a batch submits; MeterReading is what the store keeps

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp layout used by uploaded batches (e.g. `22/04/2019 09:24`)
pub const READING_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

// ============================================================================
// CANDIDATE READING
// ============================================================================

/// One submitted, not-yet-validated meter reading.
///
/// The raw value is kept exactly as submitted; format checks belong to the
/// validator, not to whoever built the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateReading {
    pub account_id: i64,
    pub timestamp: NaiveDateTime,
    pub raw_value: String,
}

impl CandidateReading {
    pub fn new(account_id: i64, timestamp: NaiveDateTime, raw_value: impl Into<String>) -> Self {
        CandidateReading {
            account_id,
            timestamp,
            raw_value: raw_value.into(),
        }
    }

    /// Key used by the duplicate rule: the full (account, time, value) triple
    pub fn dedup_key(&self) -> (i64, NaiveDateTime, &str) {
        (self.account_id, self.timestamp, self.raw_value.as_str())
    }
}

// ============================================================================
// PERSISTED READING
// ============================================================================

/// A reading that passed validation and was written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    /// Fresh identity assigned at insert time
    pub id: Uuid,
    pub account_id: i64,
    pub timestamp: NaiveDateTime,
    pub value: i32,
}

impl MeterReading {
    /// Build the persisted form of an accepted candidate.
    ///
    /// Returns `None` when the raw value is not an integer, which cannot
    /// happen for candidates that passed the value-format rule.
    pub fn from_accepted(candidate: &CandidateReading) -> Option<Self> {
        let value = candidate.raw_value.parse::<i32>().ok()?;

        Some(MeterReading {
            id: Uuid::new_v4(),
            account_id: candidate.account_id,
            timestamp: candidate.timestamp,
            value,
        })
    }

    /// Back to candidate form, with the value zero-padded to five digits
    pub fn to_candidate(&self) -> CandidateReading {
        CandidateReading {
            account_id: self.account_id,
            timestamp: self.timestamp,
            raw_value: format!("{:05}", self.value),
        }
    }
}

// ============================================================================
// CUSTOMER ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAccount {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl CustomerAccount {
    pub fn new(id: i64, first_name: &str, last_name: &str) -> Self {
        CustomerAccount {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }
}

/// Accounts every fresh store is seeded with
pub const SEED_ACCOUNTS: &[(i64, &str, &str)] = &[
    (2344, "Tommy", "Test"),
    (2233, "Barry", "Test"),
    (8766, "Sally", "Test"),
    (2345, "Jerry", "Test"),
    (2346, "Ollie", "Test"),
    (2347, "Tara", "Test"),
    (2348, "Tammy", "Test"),
    (2349, "Simon", "Test"),
    (2350, "Colin", "Test"),
    (2351, "Gladys", "Test"),
    (2352, "Greg", "Test"),
    (2353, "Tony", "Test"),
    (2355, "Arthur", "Test"),
    (2356, "Craig", "Test"),
    (6776, "Laura", "Test"),
    (4534, "JOSH", "TEST"),
    (1234, "Freya", "Test"),
    (1239, "Noddy", "Test"),
    (1240, "Archie", "Test"),
    (1241, "Lara", "Test"),
    (1242, "Tim", "Test"),
    (1243, "Graham", "Test"),
    (1244, "Tony", "Test"),
    (1245, "Neville", "Test"),
    (1246, "Jo", "Test"),
    (1247, "Jim", "Test"),
    (1248, "Pam", "Test"),
];

pub fn seed_accounts() -> Vec<CustomerAccount> {
    SEED_ACCOUNTS
        .iter()
        .map(|(id, first, last)| CustomerAccount::new(*id, first, last))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
