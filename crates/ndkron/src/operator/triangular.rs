//! Batched dense triangular matrix operator.

use std::sync::Arc;

use faer::linalg::triangular_solve::{
    solve_lower_triangular_in_place, solve_upper_triangular_in_place,
};
use faer::{Mat, MatRef, Par};

use crate::error::OperatorError;
use crate::operator::dense::identity;
use crate::operator::{DenseOperator, LinearOperator, OperatorRef, OperatorSize};
use crate::operations::{
    as_column_matrix, batched_matmul, batched_t_matmul, map_matrices, squeeze_vector_result,
    zip_matrices,
};
use crate::scalar::Scalar;
use crate::shape::broadcast_shapes;
use crate::tensor::DenseTensor;

/// A batch of lower or upper triangular matrices.
///
/// Entries on the other side of the diagonal are zeroed at construction, so
/// products, gathers and `to_dense` agree with the substitution in `solve`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangularOperator<T: Scalar> {
    tensor: DenseTensor<T>,
    upper: bool,
}

impl<T: Scalar> TriangularOperator<T> {
    /// Wrap square matrices `[n, n, batch...]` as a triangular operator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFactor` for rank < 2 and `NotSquareMatrix` for
    /// rectangular matrices.
    pub fn new(mut tensor: DenseTensor<T>, upper: bool) -> Result<Self, OperatorError> {
        if tensor.ndim() < 2 {
            return Err(OperatorError::InvalidFactor {
                ndim: tensor.ndim(),
            });
        }
        if tensor.nrows() != tensor.ncols() {
            return Err(OperatorError::NotSquareMatrix {
                rows: tensor.nrows(),
                cols: tensor.ncols(),
            });
        }
        let n = tensor.nrows();
        if n > 0 {
            for (k, v) in tensor.data_mut().iter_mut().enumerate() {
                let (i, j) = (k % n, (k / n) % n);
                if (upper && i > j) || (!upper && i < j) {
                    *v = T::zero();
                }
            }
        }
        Ok(Self { tensor, upper })
    }

    /// Whether the matrices are upper triangular.
    pub fn upper(&self) -> bool {
        self.upper
    }

    /// Underlying dense data.
    pub fn tensor(&self) -> &DenseTensor<T> {
        &self.tensor
    }
}

/// Solve `tri x = b` by substitution.
pub(crate) fn triangular_solve<T: Scalar>(
    tri: MatRef<'_, T>,
    b: MatRef<'_, T>,
    upper: bool,
) -> Result<Mat<T>, OperatorError> {
    if let Some(i) = (0..tri.nrows()).find(|&i| tri[(i, i)] == T::zero()) {
        return Err(OperatorError::SingularMatrix {
            message: format!("zero on the diagonal of a triangular matrix at position {i}"),
        });
    }
    let mut x = b.to_owned();
    if upper {
        solve_upper_triangular_in_place(tri, x.as_mut(), Par::Seq);
    } else {
        solve_lower_triangular_in_place(tri, x.as_mut(), Par::Seq);
    }
    Ok(x)
}

impl<T: Scalar> LinearOperator<T> for TriangularOperator<T> {
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
        let n = self.tensor.nrows();
        let (rhs, was_vector) = as_column_matrix(rhs)?;
        if rhs.nrows() != n {
            return Err(OperatorError::DimensionMismatch {
                expected: n,
                actual: rhs.nrows(),
            });
        }
        let batch = broadcast_shapes(self.tensor.batch_shape(), rhs.batch_shape())?;
        let upper = self.upper;
        let result = zip_matrices(&self.tensor, &rhs, &batch, n, rhs.ncols(), |a, b| {
            triangular_solve(a, b, upper)
        })?;
        squeeze_vector_result(result, was_vector)
    }

    fn cholesky(&self, upper: bool) -> Result<OperatorRef<T>, OperatorError> {
        DenseOperator::new(self.tensor.clone())?.cholesky(upper)
    }

    fn inverse(&self) -> Result<OperatorRef<T>, OperatorError> {
        let n = self.tensor.nrows();
        let eye = identity::<T>(n);
        let upper = self.upper;
        let inv = map_matrices(&self.tensor, n, n, |a| {
            triangular_solve(a, eye.as_ref(), upper)
        })?;
        Ok(Arc::new(Self { tensor: inv, upper }))
    }

    fn transpose(&self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(Self {
            tensor: self.tensor.transpose_matrices()?,
            upper: !self.upper,
        }))
    }

    fn get_indices(
        &self,
        row_index: &[usize],
        col_index: &[usize],
        batch_indices: &[&[usize]],
    ) -> Result<Vec<T>, OperatorError> {
        DenseOperator::new(self.tensor.clone())?.get_indices(row_index, col_index, batch_indices)
    }

    fn expand_batch(&self, batch_shape: &[usize]) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(Self {
            tensor: self.tensor.expand_batch(batch_shape)?,
            upper: self.upper,
        }))
    }

    fn is_triangular(&self) -> bool {
        true
    }

    fn to_dense(&self) -> Result<DenseTensor<T>, OperatorError> {
        Ok(self.tensor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lower() -> TriangularOperator<f64> {
        // [[2, 0], [1, 3]]
        TriangularOperator::new(
            DenseTensor::from_vec(vec![2.0, 1.0, 0.0, 3.0], &[2, 2]).unwrap(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_rectangular() {
        let err = TriangularOperator::new(DenseTensor::<f64>::zeros(&[2, 3]), true).unwrap_err();
        assert!(matches!(err, OperatorError::NotSquareMatrix { rows: 2, cols: 3 }));
    }

    #[test]
    fn test_solve_lower() {
        let l = lower();
        let b = DenseTensor::from_vec(vec![4.0, 11.0], &[2]).unwrap();
        let x = l.solve(&b).unwrap();
        assert_relative_eq!(x.data()[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x.data()[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transpose_solves_upper() {
        let u = lower().transpose().unwrap();
        assert!(u.is_triangular());
        // [[2, 1], [0, 3]] x = [7, 9] -> x = [2, 3]
        let b = DenseTensor::from_vec(vec![7.0, 9.0], &[2]).unwrap();
        let x = u.solve(&b).unwrap();
        assert_relative_eq!(x.data()[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x.data()[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_new_zeroes_other_triangle() {
        // full [[2, 5], [1, 3]] kept as lower, then as upper, over a batch of 2
        let full =
            DenseTensor::from_vec(vec![2.0, 1.0, 5.0, 3.0, 2.0, 1.0, 5.0, 3.0], &[2, 2, 2])
                .unwrap();
        let l = TriangularOperator::new(full.clone(), false).unwrap();
        let u = TriangularOperator::new(full, true).unwrap();
        for b in 0..2 {
            assert_eq!(*l.tensor().get(&[0, 1, b]).unwrap(), 0.0);
            assert_eq!(*l.tensor().get(&[1, 0, b]).unwrap(), 1.0);
            assert_eq!(*u.tensor().get(&[1, 0, b]).unwrap(), 0.0);
            assert_eq!(*u.tensor().get(&[0, 1, b]).unwrap(), 5.0);
        }

        let x = DenseTensor::from_vec(vec![1.0, -2.0], &[2]).unwrap();
        for t in [&l, &u] {
            let y = t.matmul(&x).unwrap();
            let back = t.solve(&y).unwrap();
            assert_relative_eq!(back.data()[0], 1.0, epsilon = 1e-12);
            assert_relative_eq!(back.data()[1], -2.0, epsilon = 1e-12);
        }
        let vals = l.get_indices(&[0, 1], &[1, 0], &[&[1, 1]]).unwrap();
        assert_eq!(vals, vec![0.0, 1.0]);
    }

    #[test]
    fn test_singular_diagonal() {
        let t = TriangularOperator::new(DenseTensor::<f64>::zeros(&[2, 2]), false).unwrap();
        assert!(matches!(
            t.solve(&DenseTensor::ones(&[2])),
            Err(OperatorError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_inverse_stays_triangular() {
        let l = lower();
        let inv = l.inverse().unwrap();
        assert!(inv.is_triangular());
        let d = inv.to_dense().unwrap();
        assert_relative_eq!(*d.get(&[0, 0]).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(*d.get(&[1, 0]).unwrap(), -1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(*d.get(&[0, 1]).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(*d.get(&[1, 1]).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_solve() {
        // A = L Lᵀ = [[4, 2], [2, 10]]
        let l = lower();
        let b = DenseTensor::from_vec(vec![6.0, 12.0], &[2]).unwrap();
        let x = l.cholesky_solve(&b, false).unwrap();
        assert_relative_eq!(x.data()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x.data()[1], 1.0, epsilon = 1e-12);

        let u = TriangularOperator::new(lower().transpose().unwrap().to_dense().unwrap(), true)
            .unwrap();
        let x = u.cholesky_solve(&b, true).unwrap();
        assert_relative_eq!(x.data()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x.data()[1], 1.0, epsilon = 1e-12);
    }
}
