//! Error types for the kegg-matrix library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum KeggError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value '{value}' at line {line}, sample '{sample}'")]
    InvalidValue {
        value: String,
        line: usize,
        sample: String,
    },

    #[error("Column count mismatch at line {line}: expected {expected} columns, got {actual}")]
    ColumnCountMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Metadata description does not match input matrix: {0}")]
    ConfigurationMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, KeggError>;
