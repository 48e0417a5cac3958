//! Permutation backend trait.

use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Backend trait for dense tensor permutation.
///
/// The Kronecker sweeps call this once per factor to move the factor's mode
/// behind the remaining ones, so it sits on the hot path of every product.
pub trait PermutationBackend {
    /// Permute `src` into `dest`.
    ///
    /// `perm[i]` gives the source dimension for the i-th dimension of `dest`.
    ///
    /// # Panics
    ///
    /// Panics if `dest` does not have the permuted shape of `src`.
    fn permute_into<ElT: Scalar>(
        dest: &mut DenseTensor<ElT>,
        src: &DenseTensor<ElT>,
        perm: &[usize],
    );
}
