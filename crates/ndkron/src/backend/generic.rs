//! Generic (loop-based) permutation backend.

use crate::backend::PermutationBackend;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Generic backend walking the destination in storage order.
///
/// An odometer over the destination's cartesian index tracks the matching
/// source offset incrementally, so no per-element index vectors are built.
pub struct GenericBackend;

impl PermutationBackend for GenericBackend {
    fn permute_into<ElT: Scalar>(
        dest: &mut DenseTensor<ElT>,
        src: &DenseTensor<ElT>,
        perm: &[usize],
    ) {
        let dest_shape: Vec<usize> = perm.iter().map(|&p| src.shape()[p]).collect();
        assert_eq!(
            dest.shape(),
            dest_shape.as_slice(),
            "destination shape must match permuted source shape"
        );

        // Source stride seen by each destination axis.
        let src_strides: Vec<usize> = perm.iter().map(|&p| src.strides()[p]).collect();
        let src_data = src.data();

        let mut counter = vec![0usize; dest_shape.len()];
        let mut offset = 0usize;
        for value in dest.data_mut().iter_mut() {
            *value = src_data[offset];
            for axis in 0..counter.len() {
                counter[axis] += 1;
                offset += src_strides[axis];
                if counter[axis] < dest_shape[axis] {
                    break;
                }
                offset -= src_strides[axis] * dest_shape[axis];
                counter[axis] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_permute_transpose() {
        let src: DenseTensor<f64> =
            DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let mut dest: DenseTensor<f64> = DenseTensor::zeros(&[3, 2]);

        GenericBackend::permute_into(&mut dest, &src, &[1, 0]);

        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(src.get(&[i, j]), dest.get(&[j, i]));
            }
        }
    }

    #[test]
    fn test_generic_permute_swap_leading_axes() {
        // The layout move used by the Kronecker sweep: [r, rest, m, b] -> [rest, r, m, b]
        let src: DenseTensor<f64> = DenseTensor::from_fn(&[2, 3, 2, 2], |idx| {
            (idx[0] * 1000 + idx[1] * 100 + idx[2] * 10 + idx[3]) as f64
        });
        let mut dest: DenseTensor<f64> = DenseTensor::zeros(&[3, 2, 2, 2]);
        GenericBackend::permute_into(&mut dest, &src, &[1, 0, 2, 3]);

        for i in 0..2 {
            for j in 0..3 {
                for k in 0..2 {
                    for b in 0..2 {
                        assert_eq!(src.get(&[i, j, k, b]), dest.get(&[j, i, k, b]));
                    }
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "destination shape")]
    fn test_generic_permute_wrong_dest() {
        let src: DenseTensor<f64> = DenseTensor::zeros(&[2, 3]);
        let mut dest: DenseTensor<f64> = DenseTensor::zeros(&[2, 3]);
        GenericBackend::permute_into(&mut dest, &src, &[1, 0]);
    }
}
