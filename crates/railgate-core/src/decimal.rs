//! Exact-precision price and size newtypes.
//!
//! Wrapping `Decimal` instead of `f64` keeps PnL, fee, and threshold
//! arithmetic free of floating-point rounding error — every invariant in
//! this workspace that compares a ratio against a clamp bound assumes
//! exact decimal comparisons.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

macro_rules! decimal_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Decimal);

        impl $name {
            pub const ZERO: Self = Self(Decimal::ZERO);
            pub const ONE: Self = Self(Decimal::ONE);

            #[must_use]
            pub fn new(value: Decimal) -> Self {
                Self(value)
            }

            #[must_use]
            pub fn inner(&self) -> Decimal {
                self.0
            }

            #[must_use]
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            #[must_use]
            pub fn is_positive(&self) -> bool {
                self.0 > Decimal::ZERO
            }

            /// Signed distance from `other` expressed in basis points of `other`.
            #[must_use]
            pub fn bps_from(&self, other: Self) -> Decimal {
                if other.0.is_zero() {
                    return Decimal::ZERO;
                }
                (self.0 - other.0) / other.0 * Decimal::from(10_000)
            }

            /// Signed distance from `other` expressed as a fraction of `other`.
            #[must_use]
            pub fn pct_from(&self, other: Self) -> Decimal {
                if other.0.is_zero() {
                    return Decimal::ZERO;
                }
                (self.0 - other.0) / other.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                Decimal::from_str(s).map(Self).map_err(CoreError::DecimalParse)
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<Decimal> for $name {
            type Output = Self;
            fn mul(self, rhs: Decimal) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<Decimal> for $name {
            type Output = Self;
            fn div(self, rhs: Decimal) -> Self {
                Self(self.0 / rhs)
            }
        }
    };
}

decimal_newtype!(Price);
decimal_newtype!(Size);

impl Price {
    /// Construct a validated price: must be strictly positive (P6/P7 —
    /// gross PnL formulas fall back to a warning+zero when entry/exit/size
    /// are not strictly positive).
    pub fn positive(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(CoreError::InvalidPrice(value));
        }
        Ok(Self(value))
    }
}

impl Size {
    pub fn positive(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(CoreError::InvalidSize(value));
        }
        Ok(Self(value))
    }

    /// Notional value of this size at the given price.
    #[must_use]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bps_from_computes_signed_distance() {
        let a = Price::new(dec!(100.05));
        let b = Price::new(dec!(100));
        assert_eq!(a.bps_from(b), dec!(5));
    }

    #[test]
    fn bps_from_zero_base_is_zero() {
        let a = Price::new(dec!(1));
        assert_eq!(a.bps_from(Price::ZERO), Decimal::ZERO);
    }

    #[test]
    fn positive_rejects_non_positive() {
        assert!(Price::positive(dec!(0)).is_err());
        assert!(Price::positive(dec!(-1)).is_err());
        assert!(Price::positive(dec!(1)).is_ok());
    }

    #[test]
    fn notional_multiplies_size_by_price() {
        let size = Size::new(dec!(0.1));
        let price = Price::new(dec!(50000));
        assert_eq!(size.notional(price), dec!(5000));
    }

    #[test]
    fn arithmetic_ops_preserve_newtype() {
        let a = Price::new(dec!(10));
        let b = Price::new(dec!(3));
        assert_eq!((a - b).inner(), dec!(7));
        assert_eq!((a * dec!(2)).inner(), dec!(20));
    }
}
