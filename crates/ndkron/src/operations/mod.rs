//! Dense tensor operations.
//!
//! ```text
//! Level 1: High-level API (permutedims, batched_matmul)
//!     → validate shapes, allocate output
//!
//! Level 2: In-place API (permutedims_into)
//!     → dispatch to backend
//!
//! Level 3: Backend implementation (GenericBackend, faer kernels)
//! ```

mod batched;
mod permutedims;

pub use batched::{
    as_column_matrix, batched_matmul, batched_t_matmul, map_matrices, squeeze_vector_result,
    zip_matrices,
};
pub use permutedims::{permutedims, permutedims_into};
