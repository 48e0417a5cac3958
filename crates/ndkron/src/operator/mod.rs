//! Matrix operator capability.
//!
//! ```text
//! LinearOperator<T> (trait)
//! ├── DenseOperator<T>       - batched dense matrix (faer kernels)
//! ├── TriangularOperator<T>  - batched dense triangular matrix
//! ├── DiagOperator<T>        - batched diagonal matrix
//! ├── KroneckerProduct<T>    - Kronecker product of operators
//! └── KroneckerTriangular<T> - Kronecker product of triangular operators
//! ```
//!
//! Operators are immutable after construction and shared as
//! [`OperatorRef`] trait objects, so a factor can take part in several
//! products at once.

mod dense;
mod diag;
mod triangular;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::OperatorError;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

pub use dense::DenseOperator;
pub use diag::DiagOperator;
pub use triangular::TriangularOperator;

/// Shared, type-erased operator handle.
pub type OperatorRef<T> = Arc<dyn LinearOperator<T>>;

/// Logical size of a (batched) operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperatorSize {
    /// Leading batch dimensions, outermost first.
    pub batch_shape: Vec<usize>,
    /// Number of rows of each matrix.
    pub rows: usize,
    /// Number of columns of each matrix.
    pub cols: usize,
}

impl OperatorSize {
    /// Create a size from its parts.
    pub fn new(batch_shape: &[usize], rows: usize, cols: usize) -> Self {
        Self {
            batch_shape: batch_shape.to_vec(),
            rows,
            cols,
        }
    }

    /// Tensor-layout shape `[rows, cols, batch...]`.
    ///
    /// # Example
    ///
    /// ```
    /// use ndkron::operator::OperatorSize;
    ///
    /// let size = OperatorSize::new(&[5], 6, 4);
    /// assert_eq!(size.shape(), vec![6, 4, 5]);
    /// ```
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.batch_shape.len() + 2);
        shape.push(self.rows);
        shape.push(self.cols);
        shape.extend_from_slice(&self.batch_shape);
        shape
    }

    /// Size of the transposed operator.
    pub fn transposed(&self) -> Self {
        Self {
            batch_shape: self.batch_shape.clone(),
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Whether each matrix is square.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

/// Capability set of a (batched) matrix operator.
///
/// Right-hand sides use the tensor layout `[rows, cols, batch...]` or are
/// plain vectors. The operator's batch shape is broadcast against the
/// right-hand side's.
pub trait LinearOperator<T: Scalar>: Debug + Send + Sync {
    /// Batch shape and matrix size.
    fn size(&self) -> OperatorSize;

    /// Leading batch dimensions.
    fn batch_shape(&self) -> Vec<usize> {
        self.size().batch_shape
    }

    /// Number of matrix rows.
    fn nrows(&self) -> usize {
        self.size().rows
    }

    /// Number of matrix columns.
    fn ncols(&self) -> usize {
        self.size().cols
    }

    /// `self @ rhs`.
    ///
    /// A vector `rhs` of length `ncols` is treated as one column. The result
    /// is squeezed back to a vector `[nrows]` only when the output has no
    /// batch dimensions; a batched operator returns `[nrows, 1, batch...]`,
    /// since `[nrows, batch]` would read as an `nrows × batch` matrix. The
    /// same applies to `t_matmul` and `solve`.
    fn matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError>;

    /// `selfᵀ @ rhs`, without transposing stored data.
    fn t_matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError>;

    /// Solve `self @ x = rhs` for `x`.
    fn solve(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError>;

    /// Solve `self @ x = rhs`, then left-multiply the solution by `left`.
    fn solve_with_left(
        &self,
        rhs: &DenseTensor<T>,
        left: Option<&DenseTensor<T>>,
    ) -> Result<DenseTensor<T>, OperatorError> {
        let res = self.solve(rhs)?;
        match left {
            Some(left) => crate::operations::batched_matmul(left, &res),
            None => Ok(res),
        }
    }

    /// Cholesky factor: lower `L` with `L Lᵀ = self`, or upper `U` with
    /// `Uᵀ U = self`.
    ///
    /// The returned operator is triangular.
    fn cholesky(&self, upper: bool) -> Result<OperatorRef<T>, OperatorError>;

    /// Solve `(L Lᵀ) x = rhs` (or `(Uᵀ U) x = rhs` when `upper`), treating
    /// `self` as the Cholesky factor.
    ///
    /// Only meaningful for triangular operators.
    fn cholesky_solve(
        &self,
        rhs: &DenseTensor<T>,
        upper: bool,
    ) -> Result<DenseTensor<T>, OperatorError> {
        let transposed = self.transpose()?;
        if upper {
            let w = transposed.solve(rhs)?;
            self.solve(&w)
        } else {
            let w = self.solve(rhs)?;
            transposed.solve(&w)
        }
    }

    /// Inverse operator.
    fn inverse(&self) -> Result<OperatorRef<T>, OperatorError>;

    /// Transpose of every matrix in the batch.
    fn transpose(&self) -> Result<OperatorRef<T>, OperatorError>;

    /// Gather individual entries.
    ///
    /// `row_index` and `col_index` have equal length; `batch_indices` holds one
    /// index slice (of the same length) per batch dimension, or is empty for
    /// unbatched operators.
    fn get_indices(
        &self,
        row_index: &[usize],
        col_index: &[usize],
        batch_indices: &[&[usize]],
    ) -> Result<Vec<T>, OperatorError>;

    /// Operator with batch dimensions broadcast to `batch_shape`.
    fn expand_batch(&self, batch_shape: &[usize]) -> Result<OperatorRef<T>, OperatorError>;

    /// Whether every matrix is triangular.
    fn is_triangular(&self) -> bool {
        false
    }

    /// Materialize as a dense tensor `[rows, cols, batch...]`.
    fn to_dense(&self) -> Result<DenseTensor<T>, OperatorError>;
}

/// Conversion into an operator handle ("lazify").
pub trait IntoOperator<T: Scalar> {
    /// Wrap `self` as a shared operator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFactor` if `self` cannot be interpreted as a matrix.
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError>;
}

impl<T: Scalar> IntoOperator<T> for OperatorRef<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(self)
    }
}

impl<T: Scalar> IntoOperator<T> for DenseTensor<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(DenseOperator::new(self)?))
    }
}

impl<T: Scalar> IntoOperator<T> for DenseOperator<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self))
    }
}

impl<T: Scalar> IntoOperator<T> for TriangularOperator<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self))
    }
}

impl<T: Scalar> IntoOperator<T> for DiagOperator<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self))
    }
}

/// Wrap anything convertible into an operator handle.
///
/// # Example
///
/// ```
/// use ndkron::Tensor;
/// use ndkron::operator::lazify;
///
/// let op = lazify(Tensor::<f64>::ones(&[2, 3])).unwrap();
/// assert_eq!((op.nrows(), op.ncols()), (2, 3));
/// assert!(lazify(Tensor::<f64>::ones(&[3])).is_err());
/// ```
pub fn lazify<T: Scalar, O: IntoOperator<T>>(value: O) -> Result<OperatorRef<T>, OperatorError> {
    value.into_operator()
}

/// Validate gather index arrays against an operator size and return their
/// common length.
pub(crate) fn check_gather_indices(
    size: &OperatorSize,
    row_index: &[usize],
    col_index: &[usize],
    batch_indices: &[&[usize]],
) -> Result<usize, OperatorError> {
    let n = row_index.len();
    if col_index.len() != n {
        return Err(OperatorError::ShapeMismatch {
            expected: n,
            actual: col_index.len(),
        });
    }
    if batch_indices.len() != size.batch_shape.len() {
        return Err(OperatorError::WrongNumberOfIndices {
            expected: size.batch_shape.len(),
            actual: batch_indices.len(),
        });
    }
    for (indices, &dim) in batch_indices.iter().zip(&size.batch_shape) {
        if indices.len() != n {
            return Err(OperatorError::ShapeMismatch {
                expected: n,
                actual: indices.len(),
            });
        }
        check_bounds(indices, dim)?;
    }
    check_bounds(row_index, size.rows)?;
    check_bounds(col_index, size.cols)?;
    Ok(n)
}

fn check_bounds(indices: &[usize], dim_size: usize) -> Result<(), OperatorError> {
    match indices.iter().find(|&&i| i >= dim_size) {
        Some(&index) => Err(OperatorError::IndexOutOfBounds { index, dim_size }),
        None => Ok(()),
    }
}

/// Linear batch offset of the `k`-th gathered entry (column-major over the
/// batch shape).
pub(crate) fn gather_batch_offset(
    batch_shape: &[usize],
    batch_indices: &[&[usize]],
    k: usize,
) -> usize {
    let mut offset = 0;
    let mut stride = 1;
    for (indices, &dim) in batch_indices.iter().zip(batch_shape) {
        offset += indices[k] * stride;
        stride *= dim;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_size() {
        let size = OperatorSize::new(&[5, 2], 6, 4);
        assert_eq!(size.shape(), vec![6, 4, 5, 2]);
        assert_eq!(size.transposed(), OperatorSize::new(&[5, 2], 4, 6));
        assert!(!size.is_square());
    }

    #[test]
    fn test_lazify_rejects_vectors() {
        let err = lazify(DenseTensor::<f64>::ones(&[3])).unwrap_err();
        assert!(err.is_construction_error());
        assert!(matches!(err, OperatorError::InvalidFactor { ndim: 1 }));
    }

    #[test]
    fn test_lazify_passthrough() {
        let op = lazify(DenseTensor::<f64>::eye(3, &[2])).unwrap();
        let same = lazify(op.clone()).unwrap();
        assert!(Arc::ptr_eq(&op, &same));
        assert_eq!(same.batch_shape(), vec![2]);
    }

    #[test]
    fn test_check_gather_indices() {
        let size = OperatorSize::new(&[2], 3, 4);
        assert_eq!(
            check_gather_indices(&size, &[0, 2], &[3, 1], &[&[1, 0]]).unwrap(),
            2
        );
        assert!(matches!(
            check_gather_indices(&size, &[0, 3], &[3, 1], &[&[1, 0]]),
            Err(OperatorError::IndexOutOfBounds {
                index: 3,
                dim_size: 3
            })
        ));
        assert!(check_gather_indices(&size, &[0], &[3, 1], &[&[1]]).is_err());
        assert!(check_gather_indices(&size, &[0], &[3], &[]).is_err());
    }

    #[test]
    fn test_gather_batch_offset() {
        let batch: &[&[usize]] = &[&[1, 0], &[2, 1]];
        assert_eq!(gather_batch_offset(&[2, 3], batch, 0), 1 + 2 * 2);
        assert_eq!(gather_batch_offset(&[2, 3], batch, 1), 2);
    }
}
