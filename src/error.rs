//! Error types for the CPA modeler
//!
//! Every failure propagates to the top-level `model_database` call; nothing
//! is swallowed or logged-and-continued inside the traversal.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// CPA modeler error types
#[derive(Error, Debug)]
pub enum Error {
    /// A column has missing entries and no value to compute a fill from
    #[error("Imputation failed for column '{column}': {reason}")]
    Imputation {
        /// Column that could not be imputed
        column: String,
        /// Why no fill value exists
        reason: String,
    },

    /// The distribution-fitting primitive rejected the data
    #[error("Model fitting failed: {0}")]
    Fit(String),

    /// Fitted parameters did not have the expected shape for encoding
    #[error("Parameter encoding failed: {0}")]
    Encoding(String),

    /// A flattened parameter cannot be used as a numeric feature
    #[error("Parameter '{0}' is not numeric and cannot become a feature column")]
    NonNumericParameter(String),

    /// Table not known to the metadata or absent from the supplied tables
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Column missing from a table (e.g. a declared key not present in the data)
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Merged extension column already exists on the parent
    #[error("Column collision while merging extension: {0}")]
    ColumnCollision(String),

    /// Key column type cannot be used to align rows
    #[error("Unsupported key type for column '{column}': {data_type}")]
    UnsupportedKeyType {
        /// Key column name
        column: String,
        /// Arrow data type of the column
        data_type: String,
    },

    /// Invalid or inconsistent dataset metadata
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Invalid model configuration
    #[error("Invalid model configuration: {0}")]
    Config(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow/Parquet error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
