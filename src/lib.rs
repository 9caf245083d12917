// Meter Reading Uploader - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod error;
pub mod parser;
pub mod reading;
pub mod store;
pub mod upload;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::{CsvError, StoreError, UploadError};
pub use parser::{load_csv, parse_readings, parse_readings_bytes};
pub use reading::{
    seed_accounts, CandidateReading, CustomerAccount, MeterReading, READING_DATETIME_FORMAT,
};
pub use store::{setup_database, MemoryStore, ReadingStore, SqliteStore};
pub use upload::{dry_run, process_batch, UploadReport};
pub use validation::{
    is_valid_reading_value, reject_duplicates, reject_invalid_values, reject_out_of_order,
    reject_unknown_accounts, validate, Rejection, RejectionRule, RuleSplit, ValidationOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber used by both binaries.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meter_readings=info,meter_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
