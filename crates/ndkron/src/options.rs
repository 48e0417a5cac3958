//! Configuration for Kronecker product operators.

/// How [`KroneckerProduct`](crate::KroneckerProduct) solves linear systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SolveStrategy {
    /// Apply each factor's solve in turn, never forming the full matrix.
    #[default]
    Separable,
    /// Materialize the full product and solve with a dense LU factorization.
    ///
    /// Useful as a reference or for tiny products.
    Dense,
}

/// Options attached to a [`KroneckerProduct`](crate::KroneckerProduct).
///
/// # Example
///
/// ```
/// use ndkron::{KroneckerOptions, SolveStrategy};
///
/// let opts = KroneckerOptions::default().with_solve_strategy(SolveStrategy::Dense);
/// assert_eq!(opts.solve_strategy, SolveStrategy::Dense);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KroneckerOptions {
    /// Solve strategy for general (non-triangular) products.
    pub solve_strategy: SolveStrategy,
}

impl KroneckerOptions {
    /// Replace the solve strategy.
    pub fn with_solve_strategy(mut self, solve_strategy: SolveStrategy) -> Self {
        self.solve_strategy = solve_strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_separable() {
        assert_eq!(KroneckerOptions::default().solve_strategy, SolveStrategy::Separable);
    }
}
