//! Axis permutation for dense tensors.
//!
//! ```text
//! permutedims(tensor, perm)
//!     → validate permutation
//!     → allocate output with permuted shape
//!     → permutedims_into(output, tensor, perm)   # backend dispatch
//! ```

use crate::backend::{GenericBackend, PermutationBackend};
use crate::error::OperatorError;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Permute the dimensions of a tensor, returning a new tensor.
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
/// use ndkron::DenseTensor;
/// use ndkron::operations::permutedims;
///
/// let t: DenseTensor<f64> = DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let t2 = permutedims(&t, &[1, 0]).unwrap();
/// assert_eq!(t2.shape(), &[3, 2]);
/// assert_eq!(t.get(&[1, 0]), t2.get(&[0, 1]));
/// ```
pub fn permutedims<T: Scalar>(
    tensor: &DenseTensor<T>,
    perm: &[usize],
) -> Result<DenseTensor<T>, OperatorError> {
    validate_permutation(perm, tensor.ndim())?;

    if perm.iter().enumerate().all(|(i, &p)| i == p) {
        return Ok(tensor.clone());
    }

    let new_shape: Vec<usize> = perm.iter().map(|&p| tensor.shape()[p]).collect();
    let mut result = DenseTensor::zeros(&new_shape);
    permutedims_into(&mut result, tensor, perm);
    Ok(result)
}

/// Permute into an existing output tensor.
///
/// # Panics
///
/// Panics if `dest` does not have the permuted shape of `src`.
pub fn permutedims_into<T: Scalar>(
    dest: &mut DenseTensor<T>,
    src: &DenseTensor<T>,
    perm: &[usize],
) {
    GenericBackend::permute_into(dest, src, perm);
}

/// Validate that perm is a permutation of 0..ndim.
fn validate_permutation(perm: &[usize], ndim: usize) -> Result<(), OperatorError> {
    let invalid = || OperatorError::InvalidPermutation {
        perm: perm.to_vec(),
        ndim,
    };
    if perm.len() != ndim {
        return Err(invalid());
    }

    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || seen[p] {
            return Err(invalid());
        }
        seen[p] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::c64;

    fn check_matrix_transpose<T: Scalar>() {
        // batched [rows, cols, batch] -> [cols, rows, batch]
        let t: DenseTensor<T> = DenseTensor::from_fn(&[2, 3, 2], |idx| {
            T::from_real((idx[0] + 10 * idx[1] + 100 * idx[2]) as f64)
        });
        let tt = permutedims(&t, &[1, 0, 2]).unwrap();
        assert_eq!(tt.shape(), &[3, 2, 2]);
        for b in 0..2 {
            for i in 0..2 {
                for j in 0..3 {
                    assert_eq!(t.get(&[i, j, b]), tt.get(&[j, i, b]));
                }
            }
        }
    }

    #[test]
    fn test_batched_transpose_f64() {
        check_matrix_transpose::<f64>();
    }

    #[test]
    fn test_batched_transpose_c64() {
        check_matrix_transpose::<c64>();
    }

    #[test]
    fn test_cyclic_permutation() {
        let t: DenseTensor<f64> = DenseTensor::from_fn(&[3, 2, 4], |idx| {
            (idx[0] * 7 + idx[1] * 3 + idx[2] * 11) as f64
        });
        let p = permutedims(&t, &[1, 2, 0]).unwrap();
        assert_eq!(p.shape(), &[2, 4, 3]);
        assert_eq!(p.get(&[1, 3, 2]), t.get(&[2, 1, 3]));
    }

    #[test]
    fn test_identity_and_size_one_axes() {
        let t: DenseTensor<f64> = DenseTensor::from_fn(&[4, 1, 3], |idx| (idx[0] + 4 * idx[2]) as f64);
        assert_eq!(permutedims(&t, &[0, 1, 2]).unwrap(), t);
        // moving a size-1 axis never reorders data
        let moved = permutedims(&t, &[1, 0, 2]).unwrap();
        assert_eq!(moved.data(), t.data());
    }

    #[test]
    fn test_rejects_bad_permutations() {
        let t: DenseTensor<f64> = DenseTensor::zeros(&[2, 3]);
        for perm in [&[0][..], &[0, 1, 2], &[0, 2], &[1, 1]] {
            assert!(matches!(
                permutedims(&t, perm),
                Err(OperatorError::InvalidPermutation { .. })
            ));
        }
    }
}
