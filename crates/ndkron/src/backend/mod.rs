//! Backend kernels for dense tensor data.
//!
//! - `GenericBackend`: loop-based axis permutation used by the Kronecker sweeps
//! - `faer_interop`: zero-copy faer views of batched matrices, so dense
//!   factor kernels run on faer's GEMM, LU, Cholesky and triangular solvers

mod faer_interop;
mod generic;
mod permutation;

pub use faer_interop::{AsFaerMat, tensor_from_faer_mats};
pub use generic::GenericBackend;
pub use permutation::PermutationBackend;
