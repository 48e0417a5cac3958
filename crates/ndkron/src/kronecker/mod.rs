//! Kronecker product operators.
//!
//! ```text
//! KroneckerProduct<T>      - general product, configurable solve
//!   └── KroneckerTriangular<T> - triangular factors, separable solves only
//! sweep                    - per-factor matmul / t_matmul / solve kernels
//! ```

mod product;
pub mod sweep;
mod triangular;

pub use product::KroneckerProduct;
pub use triangular::KroneckerTriangular;
