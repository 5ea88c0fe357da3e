//! Error types for the tabular learning engine.

use thiserror::Error;

/// Unified error type for every algorithm and engine operation.
#[derive(Debug, Error)]
pub enum TabsightError {
    /// No rows or no columns are loaded.
    #[error("dataset is empty: load rows and columns first")]
    EmptyDataset,

    /// The class column could not be resolved.
    #[error("no class column: name a column \"class\" or \"label\"")]
    NoClassColumn,

    /// A non-numeric cell was found where a number was required.
    #[error("malformed instance: row {row}, column {column} holds non-numeric value {value:?}")]
    MalformedInstance {
        row: usize,
        column: usize,
        value: String,
    },

    /// Gauss-Jordan elimination hit a (near-)zero pivot.
    #[error("matrix is singular: zero pivot at index {pivot}")]
    SingularMatrix { pivot: usize },

    /// A hyperparameter or argument is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shapes of two inputs do not agree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Estimator used before `fit`.
    #[error("{0} not fitted. Call fit() first.")]
    NotFitted(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TabsightError>;
