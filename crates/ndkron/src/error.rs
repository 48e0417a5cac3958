//! Error types for ndkron.

use thiserror::Error;

/// Errors that can occur in operator construction and evaluation.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// A Kronecker product needs at least one factor.
    #[error("Kronecker product requires at least one factor")]
    EmptyFactorList,

    /// Input cannot be treated as a matrix operator.
    #[error("cannot build an operator from a tensor of rank {ndim}; expected rank >= 2")]
    InvalidFactor { ndim: usize },

    /// Factors of a Kronecker product disagree on batch shape.
    #[error("Kronecker product expects factors with the same batch shapes, got {shapes:?}")]
    BatchShapeMismatch { shapes: Vec<Vec<usize>> },

    /// A triangular Kronecker product was given a non-triangular factor.
    #[error("factor {index} of a triangular Kronecker product is not triangular")]
    NonTriangularFactor { index: usize },

    /// Shapes cannot be broadcast together.
    #[error("cannot broadcast shapes {lhs:?} and {rhs:?}")]
    BroadcastError { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Inner matrix dimensions disagree.
    #[error("dimension mismatch: operator has {expected} columns, right-hand side has {actual} rows")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// Wrong number of indices provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Invalid permutation.
    #[error("invalid permutation {perm:?} for tensor with {ndim} dimensions")]
    InvalidPermutation { perm: Vec<usize>, ndim: usize },

    /// Matrix must be square.
    #[error("matrix must be square: got {rows}x{cols}")]
    NotSquareMatrix { rows: usize, cols: usize },

    /// Cholesky factorization failed.
    #[error("matrix is not positive definite: {message}")]
    NotPositiveDefinite { message: String },

    /// A solve or inverse hit a singular matrix.
    #[error("matrix is singular: {message}")]
    SingularMatrix { message: String },
}

impl OperatorError {
    /// Whether this error was raised while constructing an operator.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyFactorList
                | Self::InvalidFactor { .. }
                | Self::BatchShapeMismatch { .. }
                | Self::NonTriangularFactor { .. }
        )
    }

    /// Whether this error came from reconciling operand shapes.
    pub fn is_broadcast_error(&self) -> bool {
        matches!(
            self,
            Self::BroadcastError { .. } | Self::DimensionMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_errors() {
        assert!(OperatorError::EmptyFactorList.is_construction_error());
        assert!(OperatorError::NonTriangularFactor { index: 1 }.is_construction_error());
        assert!(
            !OperatorError::SingularMatrix {
                message: String::new()
            }
            .is_construction_error()
        );
    }

    #[test]
    fn test_display() {
        let err = OperatorError::BatchShapeMismatch {
            shapes: vec![vec![2], vec![3]],
        };
        assert_eq!(
            err.to_string(),
            "Kronecker product expects factors with the same batch shapes, got [[2], [3]]"
        );
        let err = OperatorError::BroadcastError {
            lhs: vec![2],
            rhs: vec![3],
        };
        assert!(err.is_broadcast_error());
    }
}
