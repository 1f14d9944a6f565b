//! Error types for the balance index engine
//!
//! Pure computations (scoring, plans, analytics, training) never fail; these
//! errors only surface at the storage, configuration and interop boundaries.

use thiserror::Error;

/// Errors that can occur while loading, persisting or exchanging data
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("CSV import rejected: {0}")]
    ImportRejected(String),
}
