use thiserror::Error;

/// Errors raised while validating inputs to, or reading results out of, the rank-sum pipeline.
///
/// Structural variants abort the whole computation. `DegenerateStatistic` is only ever
/// produced when a single result cell is read back, never by the pipeline itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankSumError {
    #[error("label vector has length {found} but the matrix has {expected} observations")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid group labeling: {0}")]
    InvalidGroupLabeling(String),
    #[error("sparsity invariant violated in column {column}: {reason}")]
    SparsityInvariantViolation { column: usize, reason: String },
    #[error("zero variance for group {group}, feature {feature}; p-value is undefined")]
    DegenerateStatistic { group: usize, feature: usize },
    #[error("matrix must have at least one row and one column")]
    EmptyMatrix,
    #[error("non-finite value at row {row}, column {column} cannot be ranked")]
    NonFiniteValue { row: usize, column: usize },
    #[error("malformed compressed storage: {0}")]
    MalformedStorage(String),
}

pub type Result<T> = std::result::Result<T, RankSumError>;
