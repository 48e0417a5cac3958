//! Scalar trait for operator element types.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

pub use faer::c64;

/// Trait for scalar types supported by ndkron.
///
/// This wraps faer's `ComplexField` with the arithmetic and helper methods
/// the operators need on individual entries.
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    /// Embed a real number.
    fn from_real(value: f64) -> Self;

    /// Real part as `f64`.
    fn re(&self) -> f64;

    /// Imaginary part as `f64` (zero for real types).
    fn im(&self) -> f64;

    /// Absolute value (modulus).
    fn modulus(&self) -> f64;

    /// Principal square root.
    fn principal_sqrt(self) -> Self;

    /// True if no component is infinite or NaN.
    fn is_finite_value(&self) -> bool;
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }

    fn from_real(value: f64) -> Self {
        value
    }

    fn re(&self) -> f64 {
        *self
    }

    fn im(&self) -> f64 {
        0.0
    }

    fn modulus(&self) -> f64 {
        self.abs()
    }

    fn principal_sqrt(self) -> Self {
        self.sqrt()
    }

    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Scalar for c64 {
    fn one() -> Self {
        c64::new(1.0, 0.0)
    }

    fn from_real(value: f64) -> Self {
        c64::new(value, 0.0)
    }

    fn re(&self) -> f64 {
        self.re
    }

    fn im(&self) -> f64 {
        self.im
    }

    fn modulus(&self) -> f64 {
        self.re.hypot(self.im)
    }

    fn principal_sqrt(self) -> Self {
        let r = self.modulus();
        let re = ((r + self.re) / 2.0).sqrt();
        let im = ((r - self.re) / 2.0).sqrt().copysign(self.im);
        c64::new(re, im)
    }

    fn is_finite_value(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_one() {
        assert_eq!(f64::zero(), 0.0);
        assert_eq!(f64::one(), 1.0);
        assert_eq!(c64::zero(), c64::new(0.0, 0.0));
        assert_eq!(c64::one(), c64::new(1.0, 0.0));
    }

    #[test]
    fn test_sqrt() {
        assert_relative_eq!(4.0f64.principal_sqrt(), 2.0);
        let z = c64::new(-4.0, 0.0).principal_sqrt();
        assert_relative_eq!(z.re, 0.0, epsilon = 1e-14);
        assert_relative_eq!(z.im, 2.0, epsilon = 1e-14);
        let w = c64::new(3.0, 4.0);
        let s = w.principal_sqrt();
        let back = s * s;
        assert_relative_eq!(back.re, 3.0, epsilon = 1e-12);
        assert_relative_eq!(back.im, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_finite() {
        assert!(1.0f64.is_finite_value());
        assert!(!f64::NAN.is_finite_value());
        assert!(!c64::new(1.0, f64::INFINITY).is_finite_value());
    }
}
