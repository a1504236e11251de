use std::path::PathBuf;

use thiserror::Error;

/// Domain failures raised by the cleaning, reporting and comparison stages.
///
/// Loader and writer code wraps these in `anyhow` with file context; callers
/// that need to tell them apart can `downcast_ref::<SolarError>()`.
#[derive(Debug, Error)]
pub enum SolarError {
    #[error("input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("column '{column}' not found in dataset")]
    MissingColumn { column: String },

    /// Every value of a measurement column is missing, so median imputation
    /// has nothing to impute with.
    #[error("column '{column}' has no numeric values; cannot compute a median for imputation")]
    NoMedian { column: String },

    #[error("column '{column}' has {actual} values but the dataset has {expected} rows")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "missing prerequisite data: {} (clean every country dataset before comparing)",
        missing.join(", ")
    )]
    PrerequisiteMissing { missing: Vec<String> },

    #[error("not enough data for {what}")]
    InsufficientData { what: String },
}

pub type SolarResult<T> = std::result::Result<T, SolarError>;
