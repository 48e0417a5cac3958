//! Batched diagonal matrix operator.

use std::sync::Arc;

use crate::error::OperatorError;
use crate::operator::{
    LinearOperator, OperatorRef, OperatorSize, check_gather_indices, gather_batch_offset,
};
use crate::operations::{as_column_matrix, squeeze_vector_result};
use crate::scalar::Scalar;
use crate::shape::{
    broadcast_shapes, broadcast_source_index, cartesian_to_linear, compute_strides,
    linear_to_cartesian, product,
};
use crate::tensor::DenseTensor;

/// A batch of square diagonal matrices, stored as their diagonals
/// `[n, batch...]`.
///
/// Products and solves cost O(n) per column.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagOperator<T: Scalar> {
    diag: DenseTensor<T>,
}

impl<T: Scalar> DiagOperator<T> {
    /// Wrap diagonals of shape `[n, batch...]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFactor` for a rank-0 tensor.
    pub fn new(diag: DenseTensor<T>) -> Result<Self, OperatorError> {
        if diag.ndim() == 0 {
            return Err(OperatorError::InvalidFactor { ndim: 0 });
        }
        Ok(Self { diag })
    }

    /// Diagonal entries `[n, batch...]`.
    pub fn diag(&self) -> &DenseTensor<T> {
        &self.diag
    }

    fn n(&self) -> usize {
        self.diag.nrows()
    }

    fn diag_batch(&self) -> &[usize] {
        &self.diag.shape()[1..]
    }

    /// Map every diagonal entry, keeping the batch shape.
    fn map_diag<F>(&self, f: F) -> Result<Self, OperatorError>
    where
        F: FnMut(&T) -> Result<T, OperatorError>,
    {
        let data = self.diag.data().iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            diag: DenseTensor::from_vec(data, self.diag.shape())?,
        })
    }

    /// Scale the rows of `rhs` by `f(d_i, x)`, broadcasting batch dimensions.
    fn scale_rows<F>(
        &self,
        rhs: &DenseTensor<T>,
        mut f: F,
    ) -> Result<DenseTensor<T>, OperatorError>
    where
        F: FnMut(T, T) -> T,
    {
        let n = self.n();
        let (rhs, was_vector) = as_column_matrix(rhs)?;
        if rhs.nrows() != n {
            return Err(OperatorError::DimensionMismatch {
                expected: n,
                actual: rhs.nrows(),
            });
        }
        let cols = rhs.ncols();
        let batch = broadcast_shapes(self.diag_batch(), rhs.batch_shape())?;
        let block = n * cols;
        let mut data = Vec::with_capacity(block * product(batch.iter().copied()));
        for b in 0..product(batch.iter().copied()) {
            let idx = linear_to_cartesian(b, &batch);
            let d = &self.diag.data()[broadcast_source_index(&idx, self.diag_batch()) * n..][..n];
            let src = broadcast_source_index(&idx, rhs.batch_shape()) * block;
            let x = &rhs.data()[src..src + block];
            for j in 0..cols {
                data.extend((0..n).map(|i| f(d[i], x[i + j * n])));
            }
        }
        let mut shape = vec![n, cols];
        shape.extend(batch);
        squeeze_vector_result(DenseTensor::from_vec(data, &shape)?, was_vector)
    }
}

impl<T: Scalar> LinearOperator<T> for DiagOperator<T> {
    fn size(&self) -> OperatorSize {
        let n = self.n();
        OperatorSize::new(self.diag_batch(), n, n)
    }

    fn matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        self.scale_rows(rhs, |d, x| d * x)
    }

    fn t_matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        self.matmul(rhs)
    }

    fn solve(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        if let Some(pos) = self.diag.data().iter().position(|&d| d == T::zero()) {
            return Err(OperatorError::SingularMatrix {
                message: format!("zero diagonal entry at linear position {pos}"),
            });
        }
        self.scale_rows(rhs, |d, x| x / d)
    }

    /// Elementwise square root of the diagonal; `upper` is irrelevant.
    ///
    /// Every entry must be real and strictly positive.
    fn cholesky(&self, _upper: bool) -> Result<OperatorRef<T>, OperatorError> {
        let root = self.map_diag(|&d| {
            if d.im() != 0.0 || d.re().is_nan() || d.re() <= 0.0 {
                return Err(OperatorError::NotPositiveDefinite {
                    message: format!("diagonal entry {d:?} is not positive"),
                });
            }
            Ok(d.principal_sqrt())
        })?;
        Ok(Arc::new(root))
    }

    fn inverse(&self) -> Result<OperatorRef<T>, OperatorError> {
        let inv = self.map_diag(|&d| {
            if d == T::zero() {
                return Err(OperatorError::SingularMatrix {
                    message: "zero diagonal entry".to_string(),
                });
            }
            Ok(T::one() / d)
        })?;
        Ok(Arc::new(inv))
    }

    fn transpose(&self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self.clone()))
    }

    fn get_indices(
        &self,
        row_index: &[usize],
        col_index: &[usize],
        batch_indices: &[&[usize]],
    ) -> Result<Vec<T>, OperatorError> {
        let size = self.size();
        let count = check_gather_indices(&size, row_index, col_index, batch_indices)?;
        let n = size.rows;
        let data = self.diag.data();
        Ok((0..count)
            .map(|k| {
                if row_index[k] != col_index[k] {
                    return T::zero();
                }
                let b = gather_batch_offset(&size.batch_shape, batch_indices, k);
                data[b * n + row_index[k]]
            })
            .collect())
    }

    fn expand_batch(&self, batch_shape: &[usize]) -> Result<OperatorRef<T>, OperatorError> {
        // view the diagonals as [n, 1, batch...] to reuse matrix broadcasting
        let n = self.n();
        let mut shape = vec![n, 1];
        shape.extend_from_slice(self.diag_batch());
        let expanded = self.diag.reshape(&shape)?.expand_batch(batch_shape)?;
        let mut out_shape = vec![n];
        out_shape.extend_from_slice(batch_shape);
        Ok(Arc::new(Self {
            diag: expanded.into_shape(&out_shape)?,
        }))
    }

    fn is_triangular(&self) -> bool {
        true
    }

    fn to_dense(&self) -> Result<DenseTensor<T>, OperatorError> {
        let n = self.n();
        let mut shape = vec![n, n];
        shape.extend_from_slice(self.diag_batch());
        let data = self.diag.data();
        let strides = compute_strides(self.diag_batch());
        Ok(DenseTensor::from_fn(&shape, |idx| {
            if idx[0] != idx[1] {
                return T::zero();
            }
            data[cartesian_to_linear(&idx[2..], &strides) * n + idx[0]]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn diag() -> DiagOperator<f64> {
        DiagOperator::new(DenseTensor::from_vec(vec![1.0, 4.0, 9.0], &[3]).unwrap()).unwrap()
    }

    #[test]
    fn test_matmul_and_solve() {
        let d = diag();
        let x = DenseTensor::from_vec(vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0], &[3, 2]).unwrap();
        let y = d.matmul(&x).unwrap();
        assert_eq!(y.data(), &[1.0, 4.0, 9.0, 2.0, 8.0, 18.0]);
        let z = d.solve(&y).unwrap();
        for i in 0..6 {
            assert_relative_eq!(z.data()[i], x.data()[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_matmul_broadcasts_rhs_batch() {
        let d = diag();
        let x: DenseTensor<f64> = DenseTensor::ones(&[3, 1, 2]);
        let y = d.matmul(&x).unwrap();
        assert_eq!(y.shape(), &[3, 1, 2]);
        assert_eq!(y.get(&[2, 0, 1]), Some(&9.0));
    }

    #[test]
    fn test_cholesky_is_sqrt() {
        let l = diag().cholesky(false).unwrap();
        assert!(l.is_triangular());
        let dense = l.to_dense().unwrap();
        assert_eq!(dense.get(&[1, 1]), Some(&2.0));
        assert_eq!(dense.get(&[2, 2]), Some(&3.0));
        assert_eq!(dense.get(&[0, 2]), Some(&0.0));

        let neg = DiagOperator::new(DenseTensor::from_vec(vec![1.0, -1.0], &[2]).unwrap()).unwrap();
        assert!(matches!(
            neg.cholesky(false),
            Err(OperatorError::NotPositiveDefinite { .. })
        ));
    }

    #[test]
    fn test_solve_zero_diagonal() {
        let d = DiagOperator::new(DenseTensor::from_vec(vec![1.0, 0.0], &[2]).unwrap()).unwrap();
        assert!(d.solve(&DenseTensor::ones(&[2])).is_err());
        assert!(d.inverse().is_err());
    }

    #[test]
    fn test_get_indices_and_expand() {
        let d = diag().expand_batch(&[2]).unwrap();
        assert_eq!(d.batch_shape(), vec![2]);
        let vals = d.get_indices(&[2, 0], &[2, 1], &[&[1, 0]]).unwrap();
        assert_eq!(vals, vec![9.0, 0.0]);
        let dense = d.to_dense().unwrap();
        assert_eq!(dense.shape(), &[3, 3, 2]);
        assert_eq!(dense.get(&[1, 1, 1]), Some(&4.0));
    }
}
