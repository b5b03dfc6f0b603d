//! Fixed-precision monetary values.
//!
//! All portfolio-side arithmetic (balances, trade values, costs) runs on
//! [`MoneyValue`]. The simulation and optimization layers convert to `f64`
//! at their boundary and back at trade emission. Banker's rounding is
//! applied only where a value leaves the engine (display, serialization);
//! internal arithmetic keeps the full 28-digit precision of the underlying
//! decimal.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::constants::{MONEY_DISPLAY_PRECISION, MONEY_MAX_MAGNITUDE};

/// Errors produced by monetary conversions.
#[derive(Error, Debug)]
pub enum MoneyError {
    /// Magnitude exceeds the supported range of 10^18.
    #[error("Monetary value {0} exceeds the supported magnitude of 1e18")]
    PrecisionOverflow(String),

    #[error("Value {0} is not representable as a decimal")]
    NotRepresentable(String),
}

/// A signed monetary scalar backed by a 96-bit decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MoneyValue(Decimal);

impl MoneyValue {
    pub const ZERO: MoneyValue = MoneyValue(Decimal::ZERO);

    /// Builds a value from a decimal, enforcing the magnitude bound.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.abs() > MONEY_MAX_MAGNITUDE {
            return Err(MoneyError::PrecisionOverflow(amount.to_string()));
        }
        Ok(MoneyValue(amount))
    }

    /// Converts a float, quantizing to currency precision (two fractional
    /// digits, banker's rounding).
    pub fn from_f64(value: f64) -> Result<Self, MoneyError> {
        Self::from_f64_with_scale(value, MONEY_DISPLAY_PRECISION)
    }

    /// Converts a float, quantizing to `scale` fractional digits.
    pub fn from_f64_with_scale(value: f64, scale: u32) -> Result<Self, MoneyError> {
        let raw = Decimal::from_f64(value)
            .ok_or_else(|| MoneyError::NotRepresentable(value.to_string()))?;
        Self::new(raw.round_dp(scale))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_sign_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        MoneyValue(self.0.abs())
    }

    pub fn floor(&self) -> Self {
        MoneyValue(self.0.floor())
    }

    pub fn min(self, other: Self) -> Self {
        MoneyValue(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        MoneyValue(self.0.max(other.0))
    }

    /// Currency-precision rounding (banker's). Output boundary only.
    pub fn rounded(&self) -> Decimal {
        self.0.round_dp(MONEY_DISPLAY_PRECISION)
    }
}

/// Unchecked decimal construction for values that never crossed the
/// serialization boundary (literals, derived arithmetic). Inputs arriving
/// from outside go through [`MoneyValue::new`].
impl From<Decimal> for MoneyValue {
    fn from(amount: Decimal) -> Self {
        MoneyValue(amount)
    }
}

impl From<i64> for MoneyValue {
    fn from(amount: i64) -> Self {
        MoneyValue(Decimal::from(amount))
    }
}

impl Add for MoneyValue {
    type Output = MoneyValue;
    fn add(self, rhs: MoneyValue) -> MoneyValue {
        MoneyValue(self.0 + rhs.0)
    }
}

impl Sub for MoneyValue {
    type Output = MoneyValue;
    fn sub(self, rhs: MoneyValue) -> MoneyValue {
        MoneyValue(self.0 - rhs.0)
    }
}

impl Neg for MoneyValue {
    type Output = MoneyValue;
    fn neg(self) -> MoneyValue {
        MoneyValue(-self.0)
    }
}

impl AddAssign for MoneyValue {
    fn add_assign(&mut self, rhs: MoneyValue) {
        self.0 += rhs.0;
    }
}

impl SubAssign for MoneyValue {
    fn sub_assign(&mut self, rhs: MoneyValue) {
        self.0 -= rhs.0;
    }
}

/// shares × price and similar value products.
impl Mul for MoneyValue {
    type Output = MoneyValue;
    fn mul(self, rhs: MoneyValue) -> MoneyValue {
        MoneyValue(self.0 * rhs.0)
    }
}

impl Mul<Decimal> for MoneyValue {
    type Output = MoneyValue;
    fn mul(self, rhs: Decimal) -> MoneyValue {
        MoneyValue(self.0 * rhs)
    }
}

/// Ratio of two monetary values (e.g. value / price = shares).
impl Div for MoneyValue {
    type Output = Decimal;
    fn div(self, rhs: MoneyValue) -> Decimal {
        self.0 / rhs.0
    }
}

impl Div<Decimal> for MoneyValue {
    type Output = MoneyValue;
    fn div(self, rhs: Decimal) -> MoneyValue {
        MoneyValue(self.0 / rhs)
    }
}

impl Sum for MoneyValue {
    fn sum<I: Iterator<Item = MoneyValue>>(iter: I) -> MoneyValue {
        iter.fold(MoneyValue::ZERO, |acc, v| acc + v)
    }
}

impl fmt::Display for MoneyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.prec$}",
            self.rounded(),
            prec = MONEY_DISPLAY_PRECISION as usize
        )
    }
}

impl Serialize for MoneyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct MoneyValueVisitor;

impl Visitor<'_> for MoneyValueVisitor {
    type Value = MoneyValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MoneyValue, E> {
        let amount = Decimal::from_str(v).map_err(de::Error::custom)?;
        MoneyValue::new(amount).map_err(de::Error::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MoneyValue, E> {
        let amount = Decimal::from_f64(v)
            .ok_or_else(|| de::Error::custom(format!("{v} is not representable")))?;
        MoneyValue::new(amount).map_err(de::Error::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MoneyValue, E> {
        MoneyValue::new(Decimal::from(v)).map_err(de::Error::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MoneyValue, E> {
        MoneyValue::new(Decimal::from(v)).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for MoneyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<MoneyValue, D::Error> {
        deserializer.deserialize_any(MoneyValueVisitor)
    }
}
