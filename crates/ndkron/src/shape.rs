//! Shape, stride and broadcasting utilities.
//!
//! Uses column-major (Fortran) order to match faer. Batched matrices are laid
//! out as `[rows, cols, batch...]`; batch shapes broadcast NumPy-style, aligned
//! at their last entry.

use crate::error::OperatorError;

/// Product of an iterator of sizes (1 for an empty iterator).
#[inline]
pub fn product<I: IntoIterator<Item = usize>>(sizes: I) -> usize {
    sizes.into_iter().product()
}

/// Compute column-major strides from shape.
///
/// For shape [d0, d1, d2, ...], returns strides [1, d0, d0*d1, ...].
///
/// # Examples
///
/// ```
/// use ndkron::shape::compute_strides;
///
/// assert_eq!(compute_strides(&[3, 4, 5]), vec![1, 3, 12]);
/// assert_eq!(compute_strides(&[]), Vec::<usize>::new());
/// ```
pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut stride = 1;
    shape
        .iter()
        .map(|&dim| {
            let s = stride;
            stride *= dim;
            s
        })
        .collect()
}

/// Convert cartesian indices to a linear index.
#[inline]
pub fn cartesian_to_linear(indices: &[usize], strides: &[usize]) -> usize {
    indices
        .iter()
        .zip(strides.iter())
        .map(|(&idx, &stride)| idx * stride)
        .sum()
}

/// Convert a linear index to cartesian indices using column-major order.
pub fn linear_to_cartesian(mut linear: usize, shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .map(|&dim| {
            let idx = linear % dim;
            linear /= dim;
            idx
        })
        .collect()
}

/// Broadcast two shapes elementwise.
///
/// Dimensions are aligned at the last entry; a missing or size-1 dimension
/// stretches to match the other shape.
///
/// # Errors
///
/// Returns `OperatorError::BroadcastError` for incompatible shapes.
///
/// # Examples
///
/// ```
/// use ndkron::shape::broadcast_shapes;
///
/// assert_eq!(broadcast_shapes(&[5], &[]).unwrap(), vec![5]);
/// assert_eq!(broadcast_shapes(&[5], &[1]).unwrap(), vec![5]);
/// assert_eq!(broadcast_shapes(&[3, 1], &[4]).unwrap(), vec![3, 4]);
/// assert!(broadcast_shapes(&[2], &[3]).is_err());
/// ```
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, OperatorError> {
    let ndim = a.len().max(b.len());
    let mut result = Vec::with_capacity(ndim);

    for i in 0..ndim {
        let a_dim = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let b_dim = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        if a_dim == b_dim || b_dim == 1 {
            result.push(a_dim);
        } else if a_dim == 1 {
            result.push(b_dim);
        } else {
            return Err(OperatorError::BroadcastError {
                lhs: a.to_vec(),
                rhs: b.to_vec(),
            });
        }
    }

    result.reverse();
    Ok(result)
}

/// Elementwise broadcast shape (alias kept for the operator vocabulary).
pub fn broadcast_mul_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>, OperatorError> {
    broadcast_shapes(a, b)
}

/// Output shape of a batched matrix product `a @ b`.
///
/// Both shapes use the `[rows, cols, batch...]` layout; a 1-D `b` is a column
/// vector. The result is `[a_rows, b_cols, broadcast(batch_a, batch_b)...]`.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the inner sizes differ and `BroadcastError`
/// if the batch shapes are incompatible.
pub fn broadcast_matmul_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>, OperatorError> {
    let (a_rows, a_cols, a_batch) = split_matrix_shape(a)?;
    let (b_rows, b_cols, b_batch) = split_matrix_shape(b)?;
    if a_cols != b_rows {
        return Err(OperatorError::DimensionMismatch {
            expected: a_cols,
            actual: b_rows,
        });
    }
    let batch = broadcast_shapes(a_batch, b_batch)?;
    let mut shape = Vec::with_capacity(batch.len() + 2);
    shape.push(a_rows);
    shape.push(b_cols);
    shape.extend(batch);
    Ok(shape)
}

/// Split a `[rows, cols, batch...]` shape; a 1-D shape is a column vector.
pub fn split_matrix_shape(shape: &[usize]) -> Result<(usize, usize, &[usize]), OperatorError> {
    match shape {
        [] => Err(OperatorError::InvalidFactor { ndim: 0 }),
        [n] => Ok((*n, 1, &[])),
        [rows, cols, batch @ ..] => Ok((*rows, *cols, batch)),
    }
}

/// Map an index into a broadcast batch shape back to a linear index into a
/// smaller `source` batch shape that was broadcast to it.
///
/// Size-1 and missing source dimensions always map to index 0.
pub fn broadcast_source_index(out_index: &[usize], source: &[usize]) -> usize {
    let offset = out_index.len() - source.len();
    let mut linear = 0;
    let mut stride = 1;
    for (d, &dim) in source.iter().enumerate() {
        let idx = if dim == 1 { 0 } else { out_index[offset + d] };
        linear += idx * stride;
        stride *= dim;
    }
    linear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_strides() {
        assert_eq!(compute_strides(&[3, 4, 5]), vec![1, 3, 12]);
        assert_eq!(compute_strides(&[2, 3]), vec![1, 2]);
        assert_eq!(compute_strides(&[5]), vec![1]);
    }

    #[test]
    fn test_linear_cartesian_roundtrip() {
        let shape = [3, 4, 5];
        let strides = compute_strides(&shape);
        for linear in 0..product(shape) {
            let cartesian = linear_to_cartesian(linear, &shape);
            assert_eq!(cartesian_to_linear(&cartesian, &strides), linear);
        }
        assert_eq!(linear_to_cartesian(3, &shape), vec![0, 1, 0]);
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[], &[]).unwrap(), Vec::<usize>::new());
        assert_eq!(broadcast_shapes(&[5], &[5]).unwrap(), vec![5]);
        assert_eq!(broadcast_shapes(&[1, 4], &[3, 1]).unwrap(), vec![3, 4]);
        assert_eq!(broadcast_shapes(&[2, 5], &[5]).unwrap(), vec![2, 5]);

        let err = broadcast_shapes(&[2, 3], &[4]).unwrap_err();
        assert!(err.is_broadcast_error());
    }

    #[test]
    fn test_broadcast_matmul_shape() {
        assert_eq!(broadcast_matmul_shape(&[6, 4], &[4]).unwrap(), vec![6, 1]);
        assert_eq!(
            broadcast_matmul_shape(&[6, 4, 5], &[4, 2]).unwrap(),
            vec![6, 2, 5]
        );
        assert_eq!(
            broadcast_matmul_shape(&[6, 4, 5], &[4, 2, 3, 1]).unwrap(),
            vec![6, 2, 3, 5]
        );
        assert!(matches!(
            broadcast_matmul_shape(&[6, 4], &[5, 2]),
            Err(OperatorError::DimensionMismatch {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_broadcast_source_index() {
        // out batch [3, 4], source [4]: first dimension is broadcast
        assert_eq!(broadcast_source_index(&[2, 3], &[4]), 3);
        // source [3, 1]: second dimension is broadcast
        assert_eq!(broadcast_source_index(&[2, 3], &[3, 1]), 2);
        // source [3, 4]: column-major linear index
        assert_eq!(broadcast_source_index(&[2, 3], &[3, 4]), 2 + 3 * 3);
        assert_eq!(broadcast_source_index(&[2, 3], &[]), 0);
    }
}
