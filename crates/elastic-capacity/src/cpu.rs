//! Exact CPU core amounts.
//!
//! Containers may request fractional cores (`0.5`, `1/3`), and amounts are
//! added and subtracted across many agents on every control-loop pass, so
//! cores are kept as a reduced arbitrary-precision fraction rather than a
//! float. Sums of unrelated denominators grow without overflowing.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CapacityError, CapacityResult};

/// A non-negative, exact number of CPU cores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuCores(BigRational);

impl CpuCores {
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    /// Whole cores.
    pub fn from_cores(cores: u32) -> Self {
        Self(BigRational::from_integer(BigInt::from(cores)))
    }

    /// `numer / denom` cores, reduced.
    pub fn from_ratio(numer: i64, denom: i64) -> CapacityResult<Self> {
        Self::from_parts(BigInt::from(numer), BigInt::from(denom))
    }

    fn from_parts(numer: BigInt, denom: BigInt) -> CapacityResult<Self> {
        if denom.is_zero() {
            return Err(CapacityError::InvalidCpu(format!("{numer}/{denom}")));
        }
        Self::from_rational(BigRational::new(numer, denom))
    }

    fn from_rational(value: BigRational) -> CapacityResult<Self> {
        if value.is_negative() {
            return Err(CapacityError::InvalidCpu(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self - other`, or `None` if the result would be negative.
    pub fn checked_sub(&self, other: &CpuCores) -> Option<CpuCores> {
        if other > self {
            None
        } else {
            Some(CpuCores(&self.0 - &other.0))
        }
    }

    /// `self - other`, clamped at zero.
    pub fn saturating_sub(&self, other: &CpuCores) -> CpuCores {
        self.checked_sub(other).unwrap_or_else(CpuCores::zero)
    }

    pub fn min(self, other: CpuCores) -> CpuCores {
        match self.cmp(&other) {
            Ordering::Greater => other,
            _ => self,
        }
    }
}

impl Default for CpuCores {
    fn default() -> Self {
        CpuCores::zero()
    }
}

impl Add for CpuCores {
    type Output = CpuCores;

    fn add(self, rhs: CpuCores) -> CpuCores {
        CpuCores(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a CpuCores> for &'a CpuCores {
    type Output = CpuCores;

    fn add(self, rhs: &'a CpuCores) -> CpuCores {
        CpuCores(&self.0 + &rhs.0)
    }
}

impl std::iter::Sum for CpuCores {
    fn sum<I: Iterator<Item = CpuCores>>(iter: I) -> Self {
        iter.fold(CpuCores::zero(), Add::add)
    }
}

impl fmt::Display for CpuCores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_integer() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

impl FromStr for CpuCores {
    type Err = CapacityError;

    /// Accepts `"2"`, `"1/2"` and finite decimals like `"0.25"`.
    fn from_str(s: &str) -> CapacityResult<Self> {
        let s = s.trim();
        let invalid = || CapacityError::InvalidCpu(s.to_string());
        let integer = |text: &str| text.trim().parse::<BigInt>().map_err(|_| invalid());

        if let Some((numer, denom)) = s.split_once('/') {
            return Self::from_parts(integer(numer)?, integer(denom)?);
        }

        if let Some((whole, frac)) = s.split_once('.') {
            if s.starts_with('-') || frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let whole = if whole.is_empty() {
                BigInt::zero()
            } else {
                integer(whole)?
            };
            let denom = num_traits::pow(BigInt::from(10u32), frac.len());
            let numer = whole * &denom + integer(frac)?;
            return Self::from_parts(numer, denom);
        }

        Self::from_rational(BigRational::from_integer(integer(s)?))
    }
}

impl Serialize for CpuCores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CpuCores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CpuCoresVisitor)
    }
}

struct CpuCoresVisitor;

impl Visitor<'_> for CpuCoresVisitor {
    type Value = CpuCores;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative cpu amount such as 2, 0.5 or \"1/2\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CpuCores, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CpuCores, E> {
        CpuCores::from_rational(BigRational::from_integer(BigInt::from(v))).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CpuCores, E> {
        CpuCores::from_rational(BigRational::from_integer(BigInt::from(v))).map_err(E::custom)
    }

    // Floats go through their shortest decimal text, so 0.5 is exactly 1/2.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CpuCores, E> {
        if !v.is_finite() {
            return Err(E::custom(CapacityError::InvalidCpu(v.to_string())));
        }
        let text = v.to_string();
        text.parse().map_err(E::custom)
    }
}
