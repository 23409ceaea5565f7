//! Path and branch probabilities.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Sub};

/// A probability in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Probability(f64);

impl Probability {
    /// The impossible event.
    pub const ZERO: Self = Self(0.0);
    /// The certain event, identity of path products.
    pub const ONE: Self = Self(1.0);

    /// Tolerance used by [`Probability::is_close`].
    pub const TOLERANCE: f64 = 1e-9;

    /// Creates a probability, rejecting values outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidProbability` for non-finite or out-of-range values.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidProbability(value))
        }
    }

    /// Uniform probability of one out of `count` options.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform(count: usize) -> Self {
        Self(1.0 / count.max(1) as f64)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns `1 - p`.
    #[must_use]
    pub fn complement(self) -> Self {
        Self((1.0 - self.0).max(0.0))
    }

    /// Returns true if the probability is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Compares two probabilities within [`Probability::TOLERANCE`].
    #[must_use]
    pub fn is_close(self, other: Self) -> bool {
        (self.0 - other.0).abs() < Self::TOLERANCE
    }
}

impl Mul for Probability {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Div<usize> for Probability {
    type Output = Self;

    #[allow(clippy::cast_precision_loss)]
    fn div(self, rhs: usize) -> Self {
        Self(self.0 / rhs.max(1) as f64)
    }
}

impl Div for Probability {
    type Output = f64;

    fn div(self, rhs: Self) -> f64 {
        self.0 / rhs.0
    }
}

impl Add for Probability {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Probability {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self((self.0 - rhs.0).max(0.0))
    }
}

impl Sum for Probability {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Mul<f64> for Probability {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(Probability::new(1.5).is_err());
        assert!(Probability::new(-0.1).is_err());
        assert!(Probability::new(f64::NAN).is_err());
        assert!(Probability::new(0.25).is_ok());
    }

    #[test]
    fn uniform_splits_mass() {
        let third = Probability::uniform(3);
        let total: Probability = [third, third, third].into_iter().sum();
        assert!(total.is_close(Probability::ONE));
    }

    #[test]
    fn subtraction_saturates_at_zero() {
        let p = Probability::new(0.2).unwrap() - Probability::new(0.3).unwrap();
        assert!(p.is_zero());
    }

    #[test]
    fn division_by_zero_count_is_identity() {
        assert!((Probability::ONE / 0).is_close(Probability::ONE));
    }
}
