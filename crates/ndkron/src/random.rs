//! Random tensor construction.
//!
//! Uniform and normal tensors for any supported scalar, plus well-conditioned
//! symmetric positive-definite batches for exercising solves and Cholesky
//! factorizations.

use rand::Rng;
use rand::distr::StandardUniform;
use rand_distr::StandardNormal;

use crate::scalar::{Scalar, c64};
use crate::shape::cartesian_to_linear;
use crate::tensor::Tensor;

/// Trait for types that can be randomly sampled from a uniform distribution.
pub trait RandomUniform: Scalar {
    /// Sample a random value from the uniform distribution [0, 1).
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self;
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for c64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        c64::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }
}

/// Trait for types that can be randomly sampled from a normal distribution.
pub trait RandomNormal: Scalar {
    /// Sample a random value from the standard normal distribution.
    fn sample_normal<R: Rng>(rng: &mut R) -> Self;
}

impl RandomNormal for f64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomNormal for c64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        // real and imaginary parts are N(0, 1/2), so E|z|^2 = 1
        let scale = std::f64::consts::FRAC_1_SQRT_2;
        c64::new(
            rng.sample::<f64, _>(StandardNormal) * scale,
            rng.sample::<f64, _>(StandardNormal) * scale,
        )
    }
}

impl<ElT: RandomUniform> Tensor<ElT> {
    /// Create a tensor with uniform random values in [0, 1).
    ///
    /// # Example
    ///
    /// ```
    /// use ndkron::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::random(&[2, 3]);
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert!(t.data().iter().all(|&v| (0.0..1.0).contains(&v)));
    /// ```
    pub fn random(shape: &[usize]) -> Self {
        Self::random_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with uniform random values using a specific RNG.
    pub fn random_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        Self::from_fn(shape, |_| ElT::sample_uniform(rng))
    }
}

impl<ElT: RandomNormal> Tensor<ElT> {
    /// Create a tensor with standard normal random values.
    pub fn randn(shape: &[usize]) -> Self {
        Self::randn_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with standard normal random values using a specific RNG.
    ///
    /// # Example
    ///
    /// ```
    /// use ndkron::Tensor;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let t1: Tensor<f64> = Tensor::randn_with_rng(&[2, 3], &mut StdRng::seed_from_u64(42));
    /// let t2: Tensor<f64> = Tensor::randn_with_rng(&[2, 3], &mut StdRng::seed_from_u64(42));
    /// assert_eq!(t1.data(), t2.data());
    /// ```
    pub fn randn_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        Self::from_fn(shape, |_| ElT::sample_normal(rng))
    }
}

impl Tensor<f64> {
    /// Random symmetric positive-definite matrices `A Aᵀ + n I` of shape
    /// `[n, n, batch...]`, with `A` standard normal.
    pub fn random_spd(n: usize, batch_shape: &[usize]) -> Self {
        Self::random_spd_with_rng(n, batch_shape, &mut rand::rng())
    }

    /// [`random_spd`](Self::random_spd) with a specific RNG.
    ///
    /// # Example
    ///
    /// ```
    /// use ndkron::Tensor;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let s = Tensor::random_spd_with_rng(3, &[2], &mut StdRng::seed_from_u64(7));
    /// assert_eq!(s.shape(), &[3, 3, 2]);
    /// assert_eq!(s.get(&[0, 2, 1]), s.get(&[2, 0, 1]));
    /// ```
    pub fn random_spd_with_rng<R: Rng>(n: usize, batch_shape: &[usize], rng: &mut R) -> Self {
        let mut shape = vec![n, n];
        shape.extend_from_slice(batch_shape);
        let a = Self::randn_with_rng(&shape, rng);
        let data = a.data();
        Self::from_fn(&shape, |idx| {
            let (i, j) = (idx[0], idx[1]);
            let base = cartesian_to_linear(&idx[2..], &a.strides()[2..]);
            let dot: f64 = (0..n)
                .map(|k| data[base + i + k * n] * data[base + j + k * n])
                .sum();
            if i == j { dot + n as f64 } else { dot }
        })
    }
}
