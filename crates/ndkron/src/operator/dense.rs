//! Batched dense matrix operator.

use std::cmp::Ordering;
use std::sync::Arc;

use faer::linalg::solvers::Solve;
use faer::{Mat, MatRef, Side};

use crate::error::OperatorError;
use crate::operator::{
    LinearOperator, OperatorRef, OperatorSize, TriangularOperator, check_gather_indices,
    gather_batch_offset,
};
use crate::operations::{
    as_column_matrix, batched_matmul, batched_t_matmul, map_matrices, squeeze_vector_result,
    zip_matrices,
};
use crate::scalar::Scalar;
use crate::shape::broadcast_shapes;
use crate::tensor::DenseTensor;

/// A batch of dense matrices stored as a `[rows, cols, batch...]` tensor.
///
/// # Example
///
/// ```
/// use ndkron::Tensor;
/// use ndkron::operator::{DenseOperator, LinearOperator};
///
/// let a = DenseOperator::new(Tensor::from_vec(vec![2.0, 0.0, 0.0, 4.0], &[2, 2]).unwrap()).unwrap();
/// let x = a.solve(&Tensor::from_vec(vec![2.0, 4.0], &[2]).unwrap()).unwrap();
/// assert_eq!(x.data(), &[1.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DenseOperator<T: Scalar> {
    tensor: DenseTensor<T>,
}

impl<T: Scalar> DenseOperator<T> {
    /// Wrap a tensor of rank >= 2.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFactor` for scalars and vectors.
    pub fn new(tensor: DenseTensor<T>) -> Result<Self, OperatorError> {
        if tensor.ndim() < 2 {
            return Err(OperatorError::InvalidFactor {
                ndim: tensor.ndim(),
            });
        }
        Ok(Self { tensor })
    }

    /// Underlying dense data.
    pub fn tensor(&self) -> &DenseTensor<T> {
        &self.tensor
    }

    fn require_square(&self) -> Result<usize, OperatorError> {
        let (rows, cols) = (self.tensor.nrows(), self.tensor.ncols());
        if rows != cols {
            return Err(OperatorError::NotSquareMatrix { rows, cols });
        }
        Ok(rows)
    }
}

/// Solve `a x = b` with partially pivoted LU.
///
/// faer's LU does not fail on singular input; a non-finite solution is
/// reported as `SingularMatrix` instead.
pub(crate) fn lu_solve<T: Scalar>(
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
) -> Result<Mat<T>, OperatorError> {
    let lu = a.partial_piv_lu();
    let mut x = b.to_owned();
    lu.solve_in_place(&mut x);
    if !all_finite(x.as_ref()) {
        return Err(OperatorError::SingularMatrix {
            message: format!(
                "LU solve of a {}x{} matrix produced non-finite values",
                a.nrows(),
                a.ncols()
            ),
        });
    }
    Ok(x)
}

pub(crate) fn identity<T: Scalar>(n: usize) -> Mat<T> {
    Mat::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
}

pub(crate) fn all_finite<T: Scalar>(mat: MatRef<'_, T>) -> bool {
    (0..mat.ncols()).all(|j| (0..mat.nrows()).all(|i| mat[(i, j)].is_finite_value()))
}

/// Cholesky factor of one symmetric positive-definite matrix.
pub(crate) fn llt_factor<T: Scalar>(
    a: MatRef<'_, T>,
    upper: bool,
) -> Result<Mat<T>, OperatorError> {
    let llt = a
        .llt(Side::Lower)
        .map_err(|e| OperatorError::NotPositiveDefinite {
            message: format!("Cholesky factorization failed: {:?}", e),
        })?;
    let l = llt.L();
    let n = l.nrows();
    // copy only the factor's triangle; the other one is explicitly zero
    Ok(Mat::from_fn(n, n, |i, j| match (upper, i.cmp(&j)) {
        (false, Ordering::Less) | (true, Ordering::Greater) => T::zero(),
        (false, _) => l[(i, j)],
        (true, _) => l[(j, i)],
    }))
}

impl<T: Scalar> LinearOperator<T> for DenseOperator<T> {
    fn size(&self) -> OperatorSize {
        OperatorSize::new(
            self.tensor.batch_shape(),
            self.tensor.nrows(),
            self.tensor.ncols(),
        )
    }

    fn matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        batched_matmul(&self.tensor, rhs)
    }

    fn t_matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        batched_t_matmul(&self.tensor, rhs)
    }

    fn solve(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        let n = self.require_square()?;
        let (rhs, was_vector) = as_column_matrix(rhs)?;
        if rhs.nrows() != n {
            return Err(OperatorError::DimensionMismatch {
                expected: n,
                actual: rhs.nrows(),
            });
        }
        let batch = broadcast_shapes(self.tensor.batch_shape(), rhs.batch_shape())?;
        let result = zip_matrices(&self.tensor, &rhs, &batch, n, rhs.ncols(), lu_solve)?;
        squeeze_vector_result(result, was_vector)
    }

    fn cholesky(&self, upper: bool) -> Result<OperatorRef<T>, OperatorError> {
        let n = self.require_square()?;
        let factor = map_matrices(&self.tensor, n, n, |a| llt_factor(a, upper))?;
        Ok(Arc::new(TriangularOperator::new(factor, upper)?))
    }

    fn inverse(&self) -> Result<OperatorRef<T>, OperatorError> {
        let n = self.require_square()?;
        let eye = identity::<T>(n);
        let inv = map_matrices(&self.tensor, n, n, |a| lu_solve(a, eye.as_ref()))?;
        Ok(Arc::new(Self { tensor: inv }))
    }

    fn transpose(&self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(Self {
            tensor: self.tensor.transpose_matrices()?,
        }))
    }

    fn get_indices(
        &self,
        row_index: &[usize],
        col_index: &[usize],
        batch_indices: &[&[usize]],
    ) -> Result<Vec<T>, OperatorError> {
        let size = self.size();
        let n = check_gather_indices(&size, row_index, col_index, batch_indices)?;
        let block = size.rows * size.cols;
        let data = self.tensor.data();
        Ok((0..n)
            .map(|k| {
                let b = gather_batch_offset(&size.batch_shape, batch_indices, k);
                data[b * block + row_index[k] + col_index[k] * size.rows]
            })
            .collect())
    }

    fn expand_batch(&self, batch_shape: &[usize]) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(Self {
            tensor: self.tensor.expand_batch(batch_shape)?,
        }))
    }

    fn to_dense(&self) -> Result<DenseTensor<T>, OperatorError> {
        Ok(self.tensor.clone())
    }
}
