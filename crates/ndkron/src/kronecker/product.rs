//! Kronecker product of linear operators.

use std::sync::Arc;

use faer::Mat;
use faer::linalg::kron::kron;
use log::debug;
use once_cell::sync::OnceCell;

use crate::backend::{AsFaerMat, tensor_from_faer_mats};
use crate::error::OperatorError;
use crate::kronecker::KroneckerTriangular;
use crate::kronecker::sweep::{kron_matmul, kron_solve, kron_t_matmul};
use crate::operator::{
    DenseOperator, IntoOperator, LinearOperator, OperatorRef, OperatorSize, check_gather_indices,
};
use crate::options::{KroneckerOptions, SolveStrategy};
use crate::scalar::Scalar;
use crate::shape::product;
use crate::tensor::DenseTensor;

/// Matrix-free Kronecker product `F_1 ⊗ F_2 ⊗ … ⊗ F_k`.
///
/// The full matrix is never formed: products, solves and index lookups are
/// carried out one factor at a time. All factors share one batch shape.
/// Size, Cholesky factors and the inverse are computed on first use and
/// cached for the lifetime of the operator.
///
/// # Example
///
/// ```
/// use ndkron::{KroneckerProduct, Tensor};
/// use ndkron::operator::LinearOperator;
///
/// let a = Tensor::from_vec(vec![1.0, 3.0, 2.0, 4.0], &[2, 2]).unwrap(); // [[1, 2], [3, 4]]
/// let b = Tensor::from_vec(vec![0.0, 1.0, 1.0, 0.0], &[2, 2]).unwrap(); // [[0, 1], [1, 0]]
/// let k = KroneckerProduct::new([a, b]).unwrap();
/// assert_eq!((k.nrows(), k.ncols()), (4, 4));
///
/// let y = k.matmul(&Tensor::from_vec(vec![1.0, 0.0, 0.0, 0.0], &[4]).unwrap()).unwrap();
/// assert_eq!(y.data(), &[0.0, 1.0, 0.0, 3.0]);
/// ```
#[derive(Debug)]
pub struct KroneckerProduct<T: Scalar> {
    factors: Vec<OperatorRef<T>>,
    options: KroneckerOptions,
    size: OnceCell<OperatorSize>,
    cholesky_lower: OnceCell<Arc<KroneckerTriangular<T>>>,
    cholesky_upper: OnceCell<Arc<KroneckerTriangular<T>>>,
    inverse: OnceCell<Arc<KroneckerProduct<T>>>,
}

impl<T: Scalar> KroneckerProduct<T> {
    /// Build a product from anything convertible into operators.
    ///
    /// # Errors
    ///
    /// - `EmptyFactorList` if no factor is given.
    /// - `InvalidFactor` if an input cannot be interpreted as a matrix.
    /// - `BatchShapeMismatch` if the factors' batch shapes differ.
    pub fn new<I, F>(factors: I) -> Result<Self, OperatorError>
    where
        I: IntoIterator<Item = F>,
        F: IntoOperator<T>,
    {
        let factors = factors
            .into_iter()
            .map(IntoOperator::into_operator)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_operators(factors, KroneckerOptions::default())
    }

    pub(crate) fn from_operators(
        factors: Vec<OperatorRef<T>>,
        options: KroneckerOptions,
    ) -> Result<Self, OperatorError> {
        let Some(first) = factors.first() else {
            return Err(OperatorError::EmptyFactorList);
        };
        let batch = first.batch_shape();
        if factors.iter().any(|f| f.batch_shape() != batch) {
            return Err(OperatorError::BatchShapeMismatch {
                shapes: factors.iter().map(|f| f.batch_shape()).collect(),
            });
        }
        Ok(Self {
            factors,
            options,
            size: OnceCell::new(),
            cholesky_lower: OnceCell::new(),
            cholesky_upper: OnceCell::new(),
            inverse: OnceCell::new(),
        })
    }

    /// Replace the options.
    ///
    /// Cached Cholesky factors and inverse are dropped since they carry the
    /// previous options.
    pub fn with_options(mut self, options: KroneckerOptions) -> Self {
        self.options = options;
        self.cholesky_lower = OnceCell::new();
        self.cholesky_upper = OnceCell::new();
        self.inverse = OnceCell::new();
        self
    }

    /// The factors, in Kronecker order.
    pub fn factors(&self) -> &[OperatorRef<T>] {
        &self.factors
    }

    /// Current options.
    pub fn options(&self) -> KroneckerOptions {
        self.options
    }

    /// Product of the transposed factors (same order).
    pub fn transpose_nonbatch(&self) -> Result<Self, OperatorError> {
        let factors = self
            .factors
            .iter()
            .map(|f| f.transpose())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_operators(factors, self.options)
    }

    /// Product with every factor broadcast to `batch_shape`.
    pub fn expanded(&self, batch_shape: &[usize]) -> Result<Self, OperatorError> {
        let factors = self
            .factors
            .iter()
            .map(|f| f.expand_batch(batch_shape))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_operators(factors, self.options)
    }

    /// Solve `self @ x = rhs` and optionally left-multiply by `left`.
    pub fn inv_matmul(
        &self,
        rhs: &DenseTensor<T>,
        left: Option<&DenseTensor<T>>,
    ) -> Result<DenseTensor<T>, OperatorError> {
        self.solve_with_left(rhs, left)
    }

    /// Cholesky factor as a triangular Kronecker product, cached per flag.
    pub fn cholesky_factor(
        &self,
        upper: bool,
    ) -> Result<Arc<KroneckerTriangular<T>>, OperatorError> {
        let cell = if upper {
            &self.cholesky_upper
        } else {
            &self.cholesky_lower
        };
        cell.get_or_try_init(|| -> Result<_, OperatorError> {
            debug!(
                "computing {} Cholesky factor of a {}-factor Kronecker product",
                if upper { "upper" } else { "lower" },
                self.factors.len()
            );
            let factors = self
                .factors
                .iter()
                .map(|f| f.cholesky(upper))
                .collect::<Result<Vec<_>, _>>()?;
            let product = Self::from_operators(factors, self.options)?;
            Ok(Arc::new(KroneckerTriangular::from_product(product, upper)?))
        })
        .cloned()
    }

    /// Inverse as a Kronecker product of factor inverses, cached.
    pub fn inverse_product(&self) -> Result<Arc<KroneckerProduct<T>>, OperatorError> {
        self.inverse
            .get_or_try_init(|| -> Result<_, OperatorError> {
                debug!(
                    "computing inverse of a {}-factor Kronecker product",
                    self.factors.len()
                );
                let factors = self
                    .factors
                    .iter()
                    .map(|f| f.inverse())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Arc::new(Self::from_operators(factors, self.options)?))
            })
            .cloned()
    }

    fn solve_dense(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        debug!(
            "dense solve of a {}x{} Kronecker product",
            self.nrows(),
            self.ncols()
        );
        DenseOperator::new(self.to_dense()?)?.solve(rhs)
    }
}

impl<T: Scalar> LinearOperator<T> for KroneckerProduct<T> {
    fn size(&self) -> OperatorSize {
        self.size
            .get_or_init(|| {
                OperatorSize::new(
                    &self.factors[0].batch_shape(),
                    product(self.factors.iter().map(|f| f.nrows())),
                    product(self.factors.iter().map(|f| f.ncols())),
                )
            })
            .clone()
    }

    fn matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        kron_matmul(&self.factors, rhs)
    }

    fn t_matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        kron_t_matmul(&self.factors, rhs)
    }

    fn solve(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        match self.options.solve_strategy {
            SolveStrategy::Separable => kron_solve(&self.factors, rhs),
            SolveStrategy::Dense => self.solve_dense(rhs),
        }
    }

    fn cholesky(&self, upper: bool) -> Result<OperatorRef<T>, OperatorError> {
        Ok(self.cholesky_factor(upper)?)
    }

    fn inverse(&self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(self.inverse_product()?)
    }

    fn transpose(&self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self.transpose_nonbatch()?))
    }

    fn get_indices(
        &self,
        row_index: &[usize],
        col_index: &[usize],
        batch_indices: &[&[usize]],
    ) -> Result<Vec<T>, OperatorError> {
        let size = self.size();
        let n = check_gather_indices(&size, row_index, col_index, batch_indices)?;
        let mut values = vec![T::one(); n];
        let (mut row_radix, mut col_radix) = (size.rows, size.cols);
        for factor in &self.factors {
            let (rows, cols) = (factor.nrows(), factor.ncols());
            row_radix = row_radix.checked_div(rows).unwrap_or(0);
            col_radix = col_radix.checked_div(cols).unwrap_or(0);
            let local_rows: Vec<usize> = row_index
                .iter()
                .map(|&i| (i / row_radix) % rows)
                .collect();
            let local_cols: Vec<usize> = col_index
                .iter()
                .map(|&j| (j / col_radix) % cols)
                .collect();
            let entries = factor.get_indices(&local_rows, &local_cols, batch_indices)?;
            for (v, e) in values.iter_mut().zip(entries) {
                *v = *v * e;
            }
        }
        Ok(values)
    }

    fn expand_batch(&self, batch_shape: &[usize]) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self.expanded(batch_shape)?))
    }

    fn to_dense(&self) -> Result<DenseTensor<T>, OperatorError> {
        let size = self.size();
        let dense = self
            .factors
            .iter()
            .map(|f| f.to_dense())
            .collect::<Result<Vec<_>, _>>()?;
        let count = product(size.batch_shape.iter().copied());
        let mut mats = Vec::with_capacity(count);
        for b in 0..count {
            let mut acc = dense[0].matrix(b).to_owned();
            for factor in &dense[1..] {
                let f = factor.matrix(b);
                let mut next = Mat::zeros(acc.nrows() * f.nrows(), acc.ncols() * f.ncols());
                kron(next.as_mut(), acc.as_ref(), f);
                acc = next;
            }
            mats.push(acc);
        }
        tensor_from_faer_mats(&mats, size.rows, size.cols, &size.batch_shape)
    }
}

impl<T: Scalar> IntoOperator<T> for KroneckerProduct<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kp() -> KroneckerProduct<f64> {
        let a = DenseTensor::from_vec(vec![2.0, 1.0, 1.0, 3.0], &[2, 2]).unwrap();
        let b = DenseTensor::from_vec(vec![4.0, 0.0, 1.0, 0.0, 5.0, 0.0, 1.0, 0.0, 6.0], &[3, 3])
            .unwrap();
        KroneckerProduct::new([a, b]).unwrap()
    }

    #[test]
    fn test_size_is_product() {
        let k = kp();
        assert_eq!(k.size(), OperatorSize::new(&[], 6, 6));
        assert_eq!(k.factors().len(), 2);
    }

    #[test]
    fn test_to_dense_block_structure() {
        let k = kp();
        let d = k.to_dense().unwrap();
        assert_eq!(d.shape(), &[6, 6]);
        // block (1, 0) is a[1, 0] * b = 1 * b
        assert_eq!(d.get(&[3, 0]), Some(&4.0));
        assert_eq!(d.get(&[5, 2]), Some(&6.0));
        // block (1, 1) is 3 * b
        assert_eq!(d.get(&[4, 4]), Some(&15.0));
    }

    #[test]
    fn test_get_indices_matches_dense() {
        let k = kp();
        let d = k.to_dense().unwrap();
        let rows: Vec<usize> = (0..36).map(|i| i % 6).collect();
        let cols: Vec<usize> = (0..36).map(|i| i / 6).collect();
        let vals = k.get_indices(&rows, &cols, &[]).unwrap();
        for ((&i, &j), v) in rows.iter().zip(&cols).zip(vals) {
            assert_relative_eq!(v, *d.get(&[i, j]).unwrap());
        }
    }

    #[test]
    fn test_memoized_values_are_shared() {
        let k = kp();
        let l1 = k.cholesky_factor(false).unwrap();
        let l2 = k.cholesky_factor(false).unwrap();
        assert!(Arc::ptr_eq(&l1, &l2));
        let u = k.cholesky_factor(true).unwrap();
        assert!(!Arc::ptr_eq(&l1, &u));
        assert!(u.upper());

        let i1 = k.inverse_product().unwrap();
        let i2 = k.inverse_product().unwrap();
        assert!(Arc::ptr_eq(&i1, &i2));
    }

    #[test]
    fn test_options_propagate() {
        let opts = KroneckerOptions::default().with_solve_strategy(SolveStrategy::Dense);
        let k = kp().with_options(opts);
        assert_eq!(k.transpose_nonbatch().unwrap().options(), opts);
        assert_eq!(k.inverse_product().unwrap().options(), opts);
        assert_eq!(k.expanded(&[2]).unwrap().options(), opts);
    }
}
