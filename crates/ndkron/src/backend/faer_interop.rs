//! Zero-copy views between batched dense tensors and faer matrices.
//!
//! A batched matrix tensor `[rows, cols, batch...]` stores each batch entry as
//! one contiguous column-major block, which is exactly faer's default layout.

use faer::{Mat, MatMut, MatRef};

use crate::error::OperatorError;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Extension trait exposing the matrices of a batched tensor to faer.
pub trait AsFaerMat<T: Scalar> {
    /// View the `batch`-th matrix (linear batch index) as a faer matrix.
    ///
    /// # Panics
    ///
    /// Panics if `batch` is out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use ndkron::Tensor;
    /// use ndkron::backend::AsFaerMat;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let mat = t.matrix(0);
    /// assert_eq!(mat.nrows(), 2);
    /// assert_eq!(mat.ncols(), 3);
    /// assert_eq!(mat[(1, 2)], 6.0);
    /// ```
    fn matrix(&self, batch: usize) -> MatRef<'_, T>;

    /// Mutable view of the `batch`-th matrix.
    fn matrix_mut(&mut self, batch: usize) -> MatMut<'_, T>;
}

impl<T: Scalar> AsFaerMat<T> for DenseTensor<T> {
    fn matrix(&self, batch: usize) -> MatRef<'_, T> {
        let (rows, cols) = (self.nrows(), self.ncols());
        let block = rows * cols;
        assert!(
            batch < self.batch_len(),
            "batch index {batch} out of range for {} matrices",
            self.batch_len()
        );
        MatRef::from_column_major_slice(&self.data()[batch * block..(batch + 1) * block], rows, cols)
    }

    fn matrix_mut(&mut self, batch: usize) -> MatMut<'_, T> {
        let (rows, cols) = (self.nrows(), self.ncols());
        let block = rows * cols;
        assert!(
            batch < self.batch_len(),
            "batch index {batch} out of range for {} matrices",
            self.batch_len()
        );
        MatMut::from_column_major_slice_mut(
            &mut self.data_mut()[batch * block..(batch + 1) * block],
            rows,
            cols,
        )
    }
}

/// Copy a faer matrix into a column-major data vector.
fn mat_to_vec<T: Scalar>(mat: MatRef<'_, T>) -> Vec<T> {
    let mut data = Vec::with_capacity(mat.nrows() * mat.ncols());
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            data.push(mat[(i, j)]);
        }
    }
    data
}

/// Assemble a batched tensor `[rows, cols, batch...]` from one faer matrix
/// per batch entry (in linear batch order).
///
/// # Errors
///
/// Returns `ShapeMismatch` if the matrices do not all have the given size or
/// their count does not match `batch_shape`.
pub fn tensor_from_faer_mats<T: Scalar>(
    mats: &[Mat<T>],
    rows: usize,
    cols: usize,
    batch_shape: &[usize],
) -> Result<DenseTensor<T>, OperatorError> {
    let mut data = Vec::with_capacity(rows * cols * mats.len());
    for mat in mats {
        if mat.nrows() != rows || mat.ncols() != cols {
            return Err(OperatorError::ShapeMismatch {
                expected: rows * cols,
                actual: mat.nrows() * mat.ncols(),
            });
        }
        data.extend(mat_to_vec(mat.as_ref()));
    }
    let mut shape = vec![rows, cols];
    shape.extend_from_slice(batch_shape);
    DenseTensor::from_vec(data, &shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_view_column_major() {
        let t = DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let mat = t.matrix(0);
        assert_relative_eq!(mat[(0, 0)], 1.0);
        assert_relative_eq!(mat[(1, 0)], 2.0);
        assert_relative_eq!(mat[(0, 1)], 3.0);
        assert_relative_eq!(mat[(1, 2)], 6.0);
        assert_eq!(t.data().as_ptr(), mat.as_ptr());
    }

    #[test]
    fn test_matrix_view_batched() {
        let t: DenseTensor<f64> =
            DenseTensor::from_fn(&[2, 2, 3], |idx| (idx[0] + 2 * idx[1] + 10 * idx[2]) as f64);
        for b in 0..3 {
            let mat = t.matrix(b);
            assert_relative_eq!(mat[(1, 1)], 3.0 + 10.0 * b as f64);
        }
    }

    #[test]
    fn test_matrix_mut() {
        let mut t: DenseTensor<f64> = DenseTensor::zeros(&[2, 2, 2]);
        {
            let mut mat = t.matrix_mut(1);
            mat[(0, 1)] = 7.0;
        }
        assert_eq!(t.get(&[0, 1, 1]), Some(&7.0));
    }

    #[test]
    fn test_tensor_from_faer_mats() {
        let mats = vec![
            Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64),
            Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64 + 100.0),
        ];
        let t = tensor_from_faer_mats(&mats, 2, 3, &[2]).unwrap();
        assert_eq!(t.shape(), &[2, 3, 2]);
        assert_eq!(t.get(&[1, 2, 0]), Some(&5.0));
        assert_eq!(t.get(&[1, 2, 1]), Some(&105.0));

        assert!(tensor_from_faer_mats(&mats, 3, 2, &[2]).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_matrix_view_out_of_range() {
        let t: DenseTensor<f64> = DenseTensor::zeros(&[2, 2]);
        let _ = t.matrix(1);
    }
}
