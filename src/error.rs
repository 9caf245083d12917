// Error types for the collaborators around the validator.
// The validator itself never fails; rejection is a classification, not an error.

use thiserror::Error;

/// Failure to turn an uploaded file into candidate readings
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid timestamp {value:?} on line {line}")]
    Timestamp { line: u64, value: String },

    #[error("No readings found in file")]
    Empty,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Reading value {0:?} cannot be stored as an integer")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
