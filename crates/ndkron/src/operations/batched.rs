//! Batched dense matrix kernels on top of faer.
//!
//! Operands use the `[rows, cols, batch...]` layout. Batch dimensions are
//! broadcast against each other; each output matrix is produced by one faer
//! call on zero-copy views of the matching input matrices.

use faer::linalg::matmul::matmul;
use faer::{Accum, Mat, MatRef, Par};

use crate::backend::{AsFaerMat, tensor_from_faer_mats};
use crate::error::OperatorError;
use crate::scalar::Scalar;
use crate::shape::{broadcast_matmul_shape, broadcast_source_index, linear_to_cartesian};
use crate::tensor::DenseTensor;

/// Batched matrix product `lhs @ rhs` with batch broadcasting.
///
/// A rank-1 `rhs` is treated as a single column; the result is squeezed back
/// to a vector when it carries no batch dimensions.
///
/// # Errors
///
/// Returns `DimensionMismatch` or `BroadcastError` for incompatible shapes.
///
/// # Example
///
/// ```
/// use ndkron::Tensor;
/// use ndkron::operations::batched_matmul;
///
/// let a = Tensor::from_vec(vec![1.0, 3.0, 2.0, 4.0], &[2, 2]).unwrap(); // [[1, 2], [3, 4]]
/// let x = Tensor::from_vec(vec![1.0, 1.0], &[2]).unwrap();
/// let y = batched_matmul(&a, &x).unwrap();
/// assert_eq!(y.data(), &[3.0, 7.0]);
/// ```
pub fn batched_matmul<T: Scalar>(
    lhs: &DenseTensor<T>,
    rhs: &DenseTensor<T>,
) -> Result<DenseTensor<T>, OperatorError> {
    matmul_impl(lhs, rhs, false)
}

/// Batched product with the transposed left operand, `lhsᵀ @ rhs`.
///
/// The transpose is a view; no data is moved.
pub fn batched_t_matmul<T: Scalar>(
    lhs: &DenseTensor<T>,
    rhs: &DenseTensor<T>,
) -> Result<DenseTensor<T>, OperatorError> {
    matmul_impl(lhs, rhs, true)
}

fn matmul_impl<T: Scalar>(
    lhs: &DenseTensor<T>,
    rhs: &DenseTensor<T>,
    transpose: bool,
) -> Result<DenseTensor<T>, OperatorError> {
    let mut lhs_shape = if transpose {
        vec![lhs.ncols(), lhs.nrows()]
    } else {
        vec![lhs.nrows(), lhs.ncols()]
    };
    lhs_shape.extend_from_slice(lhs.batch_shape());

    let out_shape = broadcast_matmul_shape(&lhs_shape, rhs.shape())?;
    let out_batch = out_shape[2..].to_vec();
    let mut out = DenseTensor::zeros(&out_shape);

    for b in 0..out.batch_len() {
        let idx = linear_to_cartesian(b, &out_batch);
        let a = lhs.matrix(broadcast_source_index(&idx, lhs.batch_shape()));
        let a = if transpose { a.transpose() } else { a };
        let x = rhs.matrix(broadcast_source_index(&idx, rhs.batch_shape()));
        matmul(out.matrix_mut(b), Accum::Replace, a, x, T::one(), Par::Seq);
    }

    squeeze_vector_result(out, rhs.ndim() == 1)
}

/// Undo the column promotion of a vector right-hand side.
///
/// `[rows, 1]` becomes `[rows]`; batched results keep their column axis so
/// the batch layout stays `[rows, cols, batch...]`.
pub fn squeeze_vector_result<T: Scalar>(
    result: DenseTensor<T>,
    was_vector: bool,
) -> Result<DenseTensor<T>, OperatorError> {
    if was_vector && result.ndim() == 2 {
        let rows = result.nrows();
        result.into_shape(&[rows])
    } else {
        Ok(result)
    }
}

/// Promote a vector to a single-column matrix; matrices pass through.
pub fn as_column_matrix<T: Scalar>(
    tensor: &DenseTensor<T>,
) -> Result<(DenseTensor<T>, bool), OperatorError> {
    if tensor.ndim() == 1 {
        Ok((tensor.reshape(&[tensor.nrows(), 1])?, true))
    } else {
        Ok((tensor.clone(), false))
    }
}

/// Apply a fallible per-matrix kernel to every matrix of a batch.
///
/// All outputs must share one size, which becomes the matrix part of the
/// result shape; the batch shape is preserved.
pub fn map_matrices<T, F>(
    tensor: &DenseTensor<T>,
    out_rows: usize,
    out_cols: usize,
    mut f: F,
) -> Result<DenseTensor<T>, OperatorError>
where
    T: Scalar,
    F: FnMut(MatRef<'_, T>) -> Result<Mat<T>, OperatorError>,
{
    let mats = (0..tensor.batch_len())
        .map(|b| f(tensor.matrix(b)))
        .collect::<Result<Vec<_>, _>>()?;
    tensor_from_faer_mats(&mats, out_rows, out_cols, tensor.batch_shape())
}

/// Apply a fallible kernel to pairs of matrices from two operands whose
/// batch shapes are broadcast against each other.
pub fn zip_matrices<T, F>(
    lhs: &DenseTensor<T>,
    rhs: &DenseTensor<T>,
    batch_shape: &[usize],
    out_rows: usize,
    out_cols: usize,
    mut f: F,
) -> Result<DenseTensor<T>, OperatorError>
where
    T: Scalar,
    F: FnMut(MatRef<'_, T>, MatRef<'_, T>) -> Result<Mat<T>, OperatorError>,
{
    let count: usize = batch_shape.iter().product();
    let mats = (0..count)
        .map(|b| {
            let idx = linear_to_cartesian(b, batch_shape);
            let a = lhs.matrix(broadcast_source_index(&idx, lhs.batch_shape()));
            let x = rhs.matrix(broadcast_source_index(&idx, rhs.batch_shape()));
            f(a, x)
        })
        .collect::<Result<Vec<_>, _>>()?;
    tensor_from_faer_mats(&mats, out_rows, out_cols, batch_shape)
}
