//! Kronecker product of triangular operators.

use std::sync::Arc;

use log::debug;
use once_cell::sync::OnceCell;

use crate::error::OperatorError;
use crate::kronecker::KroneckerProduct;
use crate::kronecker::sweep::kron_solve;
use crate::operator::{IntoOperator, LinearOperator, OperatorRef, OperatorSize};
use crate::options::KroneckerOptions;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Kronecker product whose factors are all triangular with one shared
/// orientation.
///
/// Typically obtained from [`KroneckerProduct::cholesky_factor`]. Solves
/// always use the per-factor sweep, whatever the configured strategy.
#[derive(Debug)]
pub struct KroneckerTriangular<T: Scalar> {
    product: KroneckerProduct<T>,
    upper: bool,
    inverse: OnceCell<Arc<KroneckerTriangular<T>>>,
}

impl<T: Scalar> KroneckerTriangular<T> {
    /// Build a triangular product.
    ///
    /// The `upper` flag is trusted as given; only the factors' triangularity
    /// is checked.
    ///
    /// # Errors
    ///
    /// Everything [`KroneckerProduct::new`] rejects, plus
    /// `NonTriangularFactor` for the first factor that is not triangular.
    pub fn new<I, F>(factors: I, upper: bool) -> Result<Self, OperatorError>
    where
        I: IntoIterator<Item = F>,
        F: IntoOperator<T>,
    {
        Self::from_product(KroneckerProduct::new(factors)?, upper)
    }

    /// Reinterpret an existing product as triangular.
    pub fn from_product(product: KroneckerProduct<T>, upper: bool) -> Result<Self, OperatorError> {
        if let Some(index) = product.factors().iter().position(|f| !f.is_triangular()) {
            return Err(OperatorError::NonTriangularFactor { index });
        }
        Ok(Self {
            product,
            upper,
            inverse: OnceCell::new(),
        })
    }

    /// Replace the options of the underlying product.
    pub fn with_options(self, options: KroneckerOptions) -> Self {
        Self {
            product: self.product.with_options(options),
            upper: self.upper,
            inverse: OnceCell::new(),
        }
    }

    /// Whether the factors are upper triangular.
    pub fn upper(&self) -> bool {
        self.upper
    }

    /// The factors, in Kronecker order.
    pub fn factors(&self) -> &[OperatorRef<T>] {
        self.product.factors()
    }

    /// The underlying general product.
    pub fn product(&self) -> &KroneckerProduct<T> {
        &self.product
    }

    /// Product of the transposed factors, with the orientation flipped.
    pub fn transpose_nonbatch(&self) -> Result<Self, OperatorError> {
        Self::from_product(self.product.transpose_nonbatch()?, !self.upper)
    }

    /// Inverse as a triangular product of factor inverses, cached.
    pub fn inverse_triangular(&self) -> Result<Arc<KroneckerTriangular<T>>, OperatorError> {
        self.inverse
            .get_or_try_init(|| -> Result<_, OperatorError> {
                debug!(
                    "computing inverse of a {}-factor triangular Kronecker product",
                    self.factors().len()
                );
                let factors = self
                    .factors()
                    .iter()
                    .map(|f| f.inverse())
                    .collect::<Result<Vec<_>, _>>()?;
                let product = KroneckerProduct::from_operators(factors, self.product.options())?;
                Ok(Arc::new(Self::from_product(product, self.upper)?))
            })
            .cloned()
    }
}

impl<T: Scalar> LinearOperator<T> for KroneckerTriangular<T> {
    fn size(&self) -> OperatorSize {
        self.product.size()
    }

    fn matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        self.product.matmul(rhs)
    }

    fn t_matmul(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        self.product.t_matmul(rhs)
    }

    fn solve(&self, rhs: &DenseTensor<T>) -> Result<DenseTensor<T>, OperatorError> {
        kron_solve(self.factors(), rhs)
    }

    fn cholesky(&self, upper: bool) -> Result<OperatorRef<T>, OperatorError> {
        self.product.cholesky(upper)
    }

    /// Solve `(T Tᵀ) x = rhs` for a lower factor or `(Tᵀ T) x = rhs` for an
    /// upper one, with two separable triangular sweeps.
    fn cholesky_solve(
        &self,
        rhs: &DenseTensor<T>,
        upper: bool,
    ) -> Result<DenseTensor<T>, OperatorError> {
        let transposed = self.transpose_nonbatch()?;
        if upper {
            let w = kron_solve(transposed.factors(), rhs)?;
            kron_solve(self.factors(), &w)
        } else {
            let w = kron_solve(self.factors(), rhs)?;
            kron_solve(transposed.factors(), &w)
        }
    }

    fn inverse(&self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(self.inverse_triangular()?)
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
        self.product.get_indices(row_index, col_index, batch_indices)
    }

    fn expand_batch(&self, batch_shape: &[usize]) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(Self::from_product(
            self.product.expanded(batch_shape)?,
            self.upper,
        )?))
    }

    fn is_triangular(&self) -> bool {
        true
    }

    fn to_dense(&self) -> Result<DenseTensor<T>, OperatorError> {
        self.product.to_dense()
    }
}

impl<T: Scalar> IntoOperator<T> for KroneckerTriangular<T> {
    fn into_operator(self) -> Result<OperatorRef<T>, OperatorError> {
        Ok(Arc::new(self))
    }
}
