//! Canonical price representation
//!
//! Prices are stored as an integer count of minor currency units. Legacy
//! rows may carry prices as formatted strings ("₹1,299.00", "Rs. 450");
//! those are accepted on input, but a price always leaves this crate as a
//! JSON number. Currency symbols are only added when rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Minor units per major unit
const MINOR_PER_MAJOR: i64 = 100;

/// Errors produced while parsing a price
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price '{0}' contains no digits")]
    NoDigits(String),
    #[error("price '{0}' is not a valid amount")]
    Invalid(String),
    #[error("price cannot be negative: {0}")]
    Negative(String),
}

/// A non-negative amount in minor currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "RawPrice")]
pub struct Price(i64);

impl Price {
    /// Build a price from whole currency units, saturating at the largest amount
    pub fn from_major(major: i64) -> Self {
        Self(major.saturating_mul(MINOR_PER_MAJOR))
    }

    /// Build a price from whole currency units, or `None` if it does not fit
    pub fn checked_from_major(major: i64) -> Option<Self> {
        major.checked_mul(MINOR_PER_MAJOR).map(Self)
    }

    /// Build a price from minor units (cents, paise)
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Amount in minor units
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Amount as a floating point number of major units
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    /// Render with a currency symbol and thousands separators
    pub fn display_with(&self, symbol: &str) -> String {
        let major = self.0 / MINOR_PER_MAJOR;
        let minor = self.0 % MINOR_PER_MAJOR;
        format!("{}{}.{:02}", symbol, group_thousands(major), minor)
    }

    /// Percentage saved relative to an original price, if it is higher
    pub fn discount_from(&self, original: Price) -> Option<u8> {
        if original.0 <= self.0 || original.0 == 0 {
            return None;
        }
        let saved = (original.0 - self.0) * 100 / original.0;
        u8::try_from(saved).ok()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % MINOR_PER_MAJOR == 0 {
            serializer.serialize_i64(self.0 / MINOR_PER_MAJOR)
        } else {
            serializer.serialize_f64(self.as_f64())
        }
    }
}

/// Wire shapes a price may arrive in
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Int(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawPrice> for Price {
    type Error = PriceError;

    fn try_from(raw: RawPrice) -> Result<Self, Self::Error> {
        match raw {
            RawPrice::Int(v) if v < 0 => Err(PriceError::Negative(v.to_string())),
            RawPrice::Int(v) => {
                Price::checked_from_major(v).ok_or_else(|| PriceError::Invalid(v.to_string()))
            }
            RawPrice::Float(v) if !v.is_finite() => Err(PriceError::Invalid(v.to_string())),
            RawPrice::Float(v) if v < 0.0 => Err(PriceError::Negative(v.to_string())),
            RawPrice::Float(v) if v >= (i64::MAX / MINOR_PER_MAJOR) as f64 => {
                Err(PriceError::Invalid(v.to_string()))
            }
            RawPrice::Float(v) => Ok(Price((v * MINOR_PER_MAJOR as f64).round() as i64)),
            RawPrice::Text(s) => parse_amount(&s),
        }
    }
}

/// Parse a possibly formatted amount such as "₹1,299.50"
fn parse_amount(input: &str) -> Result<Price, PriceError> {
    let start = input
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| PriceError::NoDigits(input.to_string()))?;

    if input[..start].contains('-') {
        return Err(PriceError::Negative(input.to_string()));
    }

    let amount: String = input[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount.as_str(), ""),
    };

    if fraction.contains('.') {
        return Err(PriceError::Invalid(input.to_string()));
    }

    let major: i64 = whole
        .parse()
        .map_err(|_| PriceError::Invalid(input.to_string()))?;

    // Two digits kept, the third rounds
    let digits: Vec<i64> = fraction
        .chars()
        .filter_map(|c| c.to_digit(10).map(i64::from))
        .collect();
    let mut minor = digits.first().copied().unwrap_or(0) * 10 + digits.get(1).copied().unwrap_or(0);
    if digits.get(2).copied().unwrap_or(0) >= 5 {
        minor += 1;
    }

    major
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|m| m.checked_add(minor))
        .map(Price)
        .ok_or_else(|| PriceError::Invalid(input.to_string()))
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
