//! Error types shared across tabsynth crates

use thiserror::Error;

/// Result type alias for table and artifact operations
pub type Result<T> = std::result::Result<T, TabSynthError>;

#[derive(Error, Debug)]
pub enum TabSynthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table has no header row")]
    EmptyTable,

    #[error("Row {row} has {actual} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}
