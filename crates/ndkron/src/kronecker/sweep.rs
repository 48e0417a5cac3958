//! Per-factor sweeps over a Kronecker-structured right-hand side.
//!
//! The row index of a Kronecker product is a mixed-radix number with the
//! first factor's digit most significant. In column-major storage the last
//! factor's digit is therefore the fastest one, so a sweep visits the
//! factors from last to first. Each step
//!
//! ```text
//! [rest * in_i, m, batch...]            current operand
//!   -> [in_i, rest * m, batch...]       factor axis in front
//!   -> [out_i, rest * m, batch...]      apply the factor
//!   -> [out_i, rest, m, batch...]       split
//!   -> [rest, out_i, m, batch...]       factor axis becomes the slowest digit
//!   -> [rest * out_i, m, batch...]      merge
//! ```
//!
//! After all factors the slowest digit belongs to the first factor, which is
//! exactly the Kronecker ordering. Only one factor's data is touched per step.

use log::trace;

use crate::error::OperatorError;
use crate::operations::{as_column_matrix, squeeze_vector_result};
use crate::operator::{LinearOperator, OperatorRef};
use crate::scalar::Scalar;
use crate::shape::{broadcast_matmul_shape, product};
use crate::tensor::DenseTensor;

/// Per-factor operation applied by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactorOp {
    Matmul,
    TMatmul,
    Solve,
}

impl FactorOp {
    /// `(input, output)` axis lengths of `factor` under this operation.
    fn dims<T: Scalar>(self, factor: &dyn LinearOperator<T>) -> (usize, usize) {
        match self {
            FactorOp::Matmul | FactorOp::Solve => (factor.ncols(), factor.nrows()),
            FactorOp::TMatmul => (factor.nrows(), factor.ncols()),
        }
    }

    fn apply<T: Scalar>(
        self,
        factor: &dyn LinearOperator<T>,
        rhs: &DenseTensor<T>,
    ) -> Result<DenseTensor<T>, OperatorError> {
        match self {
            FactorOp::Matmul => factor.matmul(rhs),
            FactorOp::TMatmul => factor.t_matmul(rhs),
            FactorOp::Solve => factor.solve(rhs),
        }
    }
}

/// `(F_1 ⊗ … ⊗ F_k) @ rhs`.
///
/// # Errors
///
/// Returns `DimensionMismatch` if `rhs` has the wrong number of rows,
/// `BroadcastError` for incompatible batch shapes and propagates factor
/// errors unchanged.
pub fn kron_matmul<T: Scalar>(
    factors: &[OperatorRef<T>],
    rhs: &DenseTensor<T>,
) -> Result<DenseTensor<T>, OperatorError> {
    sweep(factors, rhs, FactorOp::Matmul)
}

/// `(F_1 ⊗ … ⊗ F_k)ᵀ @ rhs`, using each factor's `t_matmul`.
pub fn kron_t_matmul<T: Scalar>(
    factors: &[OperatorRef<T>],
    rhs: &DenseTensor<T>,
) -> Result<DenseTensor<T>, OperatorError> {
    sweep(factors, rhs, FactorOp::TMatmul)
}

/// Solve `(F_1 ⊗ … ⊗ F_k) x = rhs` by solving with each factor in turn.
///
/// # Errors
///
/// Returns `NotSquareMatrix` if a factor is not square; singular factors
/// surface as the factor's own error.
pub fn kron_solve<T: Scalar>(
    factors: &[OperatorRef<T>],
    rhs: &DenseTensor<T>,
) -> Result<DenseTensor<T>, OperatorError> {
    if let Some(f) = factors.iter().find(|f| f.nrows() != f.ncols()) {
        return Err(OperatorError::NotSquareMatrix {
            rows: f.nrows(),
            cols: f.ncols(),
        });
    }
    sweep(factors, rhs, FactorOp::Solve)
}

fn sweep<T: Scalar>(
    factors: &[OperatorRef<T>],
    rhs: &DenseTensor<T>,
    op: FactorOp,
) -> Result<DenseTensor<T>, OperatorError> {
    let Some(first) = factors.first() else {
        return Err(OperatorError::EmptyFactorList);
    };
    let dims: Vec<(usize, usize)> = factors.iter().map(|f| op.dims(f.as_ref())).collect();

    let (rhs, was_vector) = as_column_matrix(rhs)?;
    let mut op_shape = vec![
        product(dims.iter().map(|d| d.1)),
        product(dims.iter().map(|d| d.0)),
    ];
    op_shape.extend(first.batch_shape());
    let out_shape = broadcast_matmul_shape(&op_shape, rhs.shape())?;
    let batch = &out_shape[2..];
    let m = rhs.ncols();

    let mut res = rhs.expand_batch(batch)?;
    let perm = axis_swap_perm(3 + batch.len());
    for (factor, &(input, output)) in factors.iter().zip(&dims).rev() {
        let rest = res.nrows().checked_div(input).unwrap_or(0);
        trace!(
            "kronecker {:?} step: factor {}x{} on rest={} m={} batch={:?}",
            op,
            output,
            input,
            rest,
            m,
            batch
        );

        res = res.into_shape(&with_batch(&[input, rest * m], batch))?;
        res = op.apply(factor.as_ref(), &res)?;
        res = res.into_shape(&with_batch(&[output, rest, m], batch))?;
        if rest > 1 && output > 1 {
            res = res.permutedims(&perm)?;
        }
        res = res.into_shape(&with_batch(&[rest * output, m], batch))?;
    }

    squeeze_vector_result(res, was_vector)
}

/// Permutation swapping the first two axes of a rank-`ndim` tensor.
fn axis_swap_perm(ndim: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..ndim).collect();
    perm.swap(0, 1);
    perm
}

fn with_batch(lead: &[usize], batch: &[usize]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(lead.len() + batch.len());
    shape.extend_from_slice(lead);
    shape.extend_from_slice(batch);
    shape
}
