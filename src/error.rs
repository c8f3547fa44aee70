//! Error types shared by every fallible operation in the crate.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or training a network.
///
/// All of these are configuration or wiring mistakes. None of them are
/// transient, so callers should report them and stop rather than retry.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    /// A matrix was requested with a zero dimension.
    #[error("matrix dimensions must be positive, got rows={rows} cols={cols}")]
    InvalidShape { rows: usize, cols: usize },

    /// A matrix literal had rows of differing lengths.
    #[error("invalid number of columns at row {row}: expected {expected}, got {found}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Two operands of `op` have incompatible shapes.
    #[error(
        "cannot {op} matrices of shape ({}, {}) and ({}, {})",
        .left.0, .left.1, .right.0, .right.1
    )]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A batch slice reaches past the end of the matrix.
    #[error("batch {index} of size {size} is out of range for {rows} rows")]
    BatchOutOfRange {
        size: usize,
        index: usize,
        rows: usize,
    },

    #[error("model must have at least 1 layer")]
    NoLayers,

    #[error("model must be initialized before use")]
    NotInitialized,

    #[error("model has already been initialized")]
    AlreadyInitialized,

    /// A layer was configured or wired with an unusable width.
    #[error("invalid layer: {0}")]
    InvalidLayer(String),

    /// The training set cannot be split evenly into batches.
    #[error(
        "cannot split {samples} samples into batches of size {batch_size}: remainder {remainder}. \
         Decrease batch size by {remainder} or increase by {}",
        .batch_size - .remainder
    )]
    BatchSize {
        batch_size: usize,
        samples: usize,
        remainder: usize,
    },

    /// A dataset has a different number of instances and labels.
    #[error("number of instances does not match number of labels ({instances} != {labels})")]
    LabelMismatch { instances: usize, labels: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
