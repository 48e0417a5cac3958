//! Dense column-major tensor used for operands and results.
//!
//! A batched matrix is a tensor of shape `[rows, cols, batch...]`, so that each
//! batch entry is one contiguous column-major block that faer can view without
//! copying. A rank-1 tensor is a plain vector.

use crate::error::OperatorError;
use crate::scalar::Scalar;
use crate::shape::{
    broadcast_shapes, broadcast_source_index, cartesian_to_linear, compute_strides,
    linear_to_cartesian, product,
};

/// A dense n-dimensional tensor in column-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<ElT: Scalar> {
    data: Vec<ElT>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

/// Type alias kept for readability at call sites that deal with dense data.
pub type DenseTensor<ElT> = Tensor<ElT>;

impl<ElT: Scalar> Tensor<ElT> {
    /// Create a new tensor with the given shape, zero-initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndkron::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: vec![ElT::zero(); product(shape.iter().copied())],
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        let mut t = Self::zeros(shape);
        t.fill(ElT::one());
        t
    }

    /// Create tensor from data (column-major) and shape.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndkron::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[1, 0]), Some(&2.0)); // column-major
    /// assert_eq!(t.get(&[0, 1]), Some(&3.0));
    /// ```
    pub fn from_vec(data: Vec<ElT>, shape: &[usize]) -> Result<Self, OperatorError> {
        let expected = product(shape.iter().copied());
        if data.len() != expected {
            return Err(OperatorError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        })
    }

    /// Create a tensor by evaluating `f` at every cartesian index.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndkron::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::from_fn(&[2, 2], |idx| (idx[0] * 10 + idx[1]) as f64);
    /// assert_eq!(t.get(&[1, 0]), Some(&10.0));
    /// ```
    pub fn from_fn<F: FnMut(&[usize]) -> ElT>(shape: &[usize], mut f: F) -> Self {
        let len = product(shape.iter().copied());
        let data = (0..len)
            .map(|linear| f(&linear_to_cartesian(linear, shape)))
            .collect();
        Self {
            data,
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    /// Create a batch of identity matrices with shape `[n, n, batch...]`.
    pub fn eye(n: usize, batch_shape: &[usize]) -> Self {
        let mut shape = vec![n, n];
        shape.extend_from_slice(batch_shape);
        Self::from_fn(&shape, |idx| {
            if idx[0] == idx[1] {
                ElT::one()
            } else {
                ElT::zero()
            }
        })
    }

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if tensor has zero elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get strides.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Get underlying data as slice.
    #[inline]
    pub fn data(&self) -> &[ElT] {
        &self.data
    }

    /// Get underlying data as mutable slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [ElT] {
        &mut self.data
    }

    /// Consume the tensor and return its data.
    #[inline]
    pub fn into_vec(self) -> Vec<ElT> {
        self.data
    }

    /// Get element by cartesian indices.
    ///
    /// Returns `None` if indices are out of bounds or of the wrong length.
    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        if indices.len() != self.ndim() {
            return None;
        }
        if indices.iter().zip(&self.shape).any(|(&idx, &dim)| idx >= dim) {
            return None;
        }
        self.data.get(cartesian_to_linear(indices, &self.strides))
    }

    /// Set element by cartesian indices.
    ///
    /// # Errors
    ///
    /// Returns error if indices are out of bounds or of the wrong length.
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), OperatorError> {
        if indices.len() != self.ndim() {
            return Err(OperatorError::WrongNumberOfIndices {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        for (&idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if idx >= dim {
                return Err(OperatorError::IndexOutOfBounds {
                    index: idx,
                    dim_size: dim,
                });
            }
        }
        let linear = cartesian_to_linear(indices, &self.strides);
        self.data[linear] = value;
        Ok(())
    }

    /// Fill all elements with a value.
    pub fn fill(&mut self, value: ElT) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Reshape to a new shape, copying the data.
    ///
    /// # Errors
    ///
    /// Returns an error if the total number of elements doesn't match.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self, OperatorError> {
        self.clone().into_shape(new_shape)
    }

    /// Reshape to a new shape, reusing the data buffer.
    ///
    /// Column-major order is preserved, so this never moves elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndkron::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let t = t.into_shape(&[3, 2]).unwrap();
    /// assert_eq!(t.get(&[0, 1]), Some(&4.0));
    /// ```
    pub fn into_shape(self, new_shape: &[usize]) -> Result<Self, OperatorError> {
        let new_len = product(new_shape.iter().copied());
        if self.len() != new_len {
            return Err(OperatorError::ShapeMismatch {
                expected: self.len(),
                actual: new_len,
            });
        }
        Ok(Self {
            data: self.data,
            shape: new_shape.to_vec(),
            strides: compute_strides(new_shape),
        })
    }

    /// Permute the dimensions of the tensor.
    ///
    /// `perm[i]` gives the source dimension for the i-th dimension of the result.
    ///
    /// # Errors
    ///
    /// Returns error if `perm` is not a valid permutation of `0..ndim`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndkron::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let t2 = t.permutedims(&[1, 0]).unwrap();
    /// assert_eq!(t2.shape(), &[3, 2]);
    /// assert_eq!(t.get(&[1, 2]), t2.get(&[2, 1]));
    /// ```
    pub fn permutedims(&self, perm: &[usize]) -> Result<Self, OperatorError> {
        crate::operations::permutedims(self, perm)
    }

    /// Number of matrix rows (first dimension).
    #[inline]
    pub fn nrows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Number of matrix columns (second dimension, 1 for vectors).
    #[inline]
    pub fn ncols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    /// Batch dimensions (everything after the two matrix dimensions).
    #[inline]
    pub fn batch_shape(&self) -> &[usize] {
        self.shape.get(2..).unwrap_or(&[])
    }

    /// Number of matrices in the batch.
    #[inline]
    pub fn batch_len(&self) -> usize {
        product(self.batch_shape().iter().copied())
    }

    /// Materialize this batched matrix broadcast to `batch_shape`.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError` if the current batch shape cannot be
    /// broadcast to `batch_shape`.
    pub fn expand_batch(&self, batch_shape: &[usize]) -> Result<Self, OperatorError> {
        let own = self.batch_shape();
        if own == batch_shape {
            return Ok(self.clone());
        }
        if broadcast_shapes(own, batch_shape)? != batch_shape {
            return Err(OperatorError::BroadcastError {
                lhs: own.to_vec(),
                rhs: batch_shape.to_vec(),
            });
        }

        let block = self.nrows() * self.ncols();
        let out_len = product(batch_shape.iter().copied());
        let mut data = Vec::with_capacity(block * out_len);
        for b in 0..out_len {
            let src = broadcast_source_index(&linear_to_cartesian(b, batch_shape), own);
            data.extend_from_slice(&self.data[src * block..(src + 1) * block]);
        }

        let mut shape = vec![self.nrows(), self.ncols()];
        shape.extend_from_slice(batch_shape);
        Self::from_vec(data, &shape)
    }

    /// Transpose every matrix in the batch.
    pub fn transpose_matrices(&self) -> Result<Self, OperatorError> {
        if self.ndim() == 1 {
            return self.reshape(&[1, self.nrows()]);
        }
        self.permutedims(&matrix_transpose_perm(self.ndim()))
    }
}

/// Permutation that swaps the two matrix axes and keeps batch axes in place.
pub(crate) fn matrix_transpose_perm(ndim: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..ndim).collect();
    perm.swap(0, 1);
    perm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::c64;

    fn test_zeros_generic<T: Scalar>() {
        let t: Tensor<T> = Tensor::zeros(&[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.ndim(), 2);
        assert_eq!(t.len(), 6);
        assert_eq!(t.strides(), &[1, 2]);
        assert!(t.data().iter().all(|v| *v == T::zero()));
    }

    #[test]
    fn test_zeros_f64() {
        test_zeros_generic::<f64>();
    }

    #[test]
    fn test_zeros_c64() {
        test_zeros_generic::<c64>();
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        let result = Tensor::<f64>::from_vec(vec![1.0, 2.0, 3.0], &[2, 3]);
        assert!(matches!(
            result,
            Err(OperatorError::ShapeMismatch {
                expected: 6,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0, 3]), None);
        assert_eq!(t.get(&[0]), None);
    }

    #[test]
    fn test_set() {
        let mut t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        t.set(&[1, 2], 42.0).unwrap();
        assert_eq!(t.get(&[1, 2]), Some(&42.0));
        assert!(t.set(&[2, 0], 1.0).is_err());
        assert!(t.set(&[0], 1.0).is_err());
    }

    #[test]
    fn test_eye() {
        let t: Tensor<f64> = Tensor::eye(3, &[2]);
        assert_eq!(t.shape(), &[3, 3, 2]);
        assert_eq!(t.get(&[1, 1, 1]), Some(&1.0));
        assert_eq!(t.get(&[0, 1, 1]), Some(&0.0));
    }

    #[test]
    fn test_matrix_accessors() {
        let v: Tensor<f64> = Tensor::zeros(&[4]);
        assert_eq!((v.nrows(), v.ncols()), (4, 1));
        assert!(v.batch_shape().is_empty());

        let m: Tensor<f64> = Tensor::zeros(&[4, 3, 5, 2]);
        assert_eq!((m.nrows(), m.ncols()), (4, 3));
        assert_eq!(m.batch_shape(), &[5, 2]);
        assert_eq!(m.batch_len(), 10);
    }

    #[test]
    fn test_into_shape_keeps_order() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let t = t.into_shape(&[6]).unwrap();
        assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn test_expand_batch() {
        let t: Tensor<f64> = Tensor::from_fn(&[2, 2, 1], |idx| (idx[0] + 2 * idx[1]) as f64);
        let e = t.expand_batch(&[3]).unwrap();
        assert_eq!(e.shape(), &[2, 2, 3]);
        for b in 0..3 {
            for i in 0..2 {
                for j in 0..2 {
                    assert_eq!(e.get(&[i, j, b]), t.get(&[i, j, 0]));
                }
            }
        }

        let unbatched: Tensor<f64> = Tensor::ones(&[2, 2]);
        assert_eq!(unbatched.expand_batch(&[4, 3]).unwrap().shape(), &[2, 2, 4, 3]);

        let batched: Tensor<f64> = Tensor::ones(&[2, 2, 5]);
        assert!(batched.expand_batch(&[3]).is_err());
        assert!(batched.expand_batch(&[]).is_err());
    }

    #[test]
    fn test_transpose_matrices() {
        let t: Tensor<f64> = Tensor::from_fn(&[2, 3, 2], |idx| {
            (idx[0] * 100 + idx[1] * 10 + idx[2]) as f64
        });
        let tt = t.transpose_matrices().unwrap();
        assert_eq!(tt.shape(), &[3, 2, 2]);
        for b in 0..2 {
            for i in 0..2 {
                for j in 0..3 {
                    assert_eq!(t.get(&[i, j, b]), tt.get(&[j, i, b]));
                }
            }
        }
    }
}
