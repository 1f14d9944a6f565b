//! Wearable import adapters
//!
//! Adapters turn an exported file into per-day wearable metrics plus
//! structured row errors. A malformed row never aborts the batch.

mod normalized_csv;

pub use normalized_csv::{parse_dd_mmm_yy, NormalizedCsvAdapter};

use crate::types::{WearableDay, WearableSource};
use serde::{Deserialize, Serialize};

/// A problem with one cell or row of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    /// 1-based row number; the header is row 1
    pub row: usize,
    pub field: String,
    pub message: String,
}

impl ImportError {
    pub fn new(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Parsed days (ascending, one per date) and the errors found on the way
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub days: Vec<WearableDay>,
    pub errors: Vec<ImportError>,
}

impl ImportOutcome {
    /// The whole file was unusable (empty or missing a required column)
    pub fn is_rejected(&self) -> bool {
        self.days.is_empty() && self.errors.iter().any(|e| e.row == 1)
    }
}

/// Trait for wearable export adapters
pub trait WearableImportAdapter {
    /// Source tag stamped on every imported day
    fn source(&self) -> WearableSource;

    /// Parse an export into wearable days
    fn parse(&self, input: &str) -> ImportOutcome;
}
