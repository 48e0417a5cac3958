//! ndkron - matrix-free Kronecker product operators
//!
//! A Kronecker product `F_1 ⊗ … ⊗ F_k` of (batched) matrices is represented
//! by its factors only. Matrix products, transposed products, linear solves,
//! Cholesky factorizations, inverses and entry lookups are all carried out
//! factor by factor, so the full `∏rows × ∏cols` matrix is never formed.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Operators (operator, kronecker modules)
//!     → LinearOperator trait, KroneckerProduct, KroneckerTriangular
//!
//! Level 2: Dense kernels (operations module)
//!     → batched_matmul, permutedims, per-matrix maps
//!
//! Level 3: Backend (backend module)
//!     → faer views and GEMM/LU/Cholesky, GenericBackend permutation
//! ```
//!
//! # Layout
//!
//! Dense data is column-major. A batched matrix has shape
//! `[rows, cols, batch...]`; a rank-1 tensor is a vector.
//!
//! # Example
//!
//! ```
//! use ndkron::{KroneckerProduct, Tensor};
//! use ndkron::operator::LinearOperator;
//!
//! let a: Tensor<f64> = Tensor::random_spd(3, &[]);
//! let b: Tensor<f64> = Tensor::random_spd(4, &[]);
//! let k = KroneckerProduct::new([a, b]).unwrap();
//!
//! let x: Tensor<f64> = Tensor::randn(&[12, 2]);
//! let y = k.matmul(&x).unwrap();
//! let x2 = k.solve(&y).unwrap();
//! for (u, v) in x.data().iter().zip(x2.data()) {
//!     assert!((u - v).abs() < 1e-8);
//! }
//! ```

pub mod backend;
pub mod error;
pub mod kronecker;
pub mod operations;
pub mod operator;
pub mod options;
pub mod random;
pub mod scalar;
pub mod shape;
pub mod tensor;

pub use error::OperatorError;
pub use kronecker::{KroneckerProduct, KroneckerTriangular};
pub use operator::{
    DenseOperator, DiagOperator, IntoOperator, LinearOperator, OperatorRef, OperatorSize,
    TriangularOperator, lazify,
};
pub use options::{KroneckerOptions, SolveStrategy};
pub use random::{RandomNormal, RandomUniform};
pub use scalar::{Scalar, c64};
pub use tensor::{DenseTensor, Tensor};
