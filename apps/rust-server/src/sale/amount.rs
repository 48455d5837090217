// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point decimal amounts.
//!
//! Token quantities, SOL prices and SOL costs all travel through the engine as
//! [`Amount`], an unsigned integer scaled by `10^9`. Nine fractional digits is
//! the precision of the native asset, so a SOL-denominated `Amount` is exactly
//! a lamport count.
//!
//! On the wire amounts are serialized as decimal strings (`"1.5"`) and accepted
//! either as strings or as JSON numbers.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits carried by [`Amount`].
pub const AMOUNT_DECIMALS: u8 = 9;

const SCALE: u128 = 1_000_000_000;

/// Errors produced while parsing or converting amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount must not be negative")]
    Negative,

    #[error("amount must be a finite number")]
    NotFinite,

    #[error("invalid amount format: {0}")]
    Invalid(String),

    #[error("too many decimal places (max {max})")]
    TooPrecise { max: u8 },

    #[error("amount overflow")]
    Overflow,
}

/// Unsigned decimal with nine fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from the raw scaled value (`1` = `0.000000001`).
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Build from a whole number of units.
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole as u128 * SCALE)
    }

    /// Raw scaled value.
    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Parse a human-readable decimal such as `"1"`, `"0.5"` or `"1000.25"`.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AmountError::Empty);
        }
        if input.starts_with('-') {
            return Err(AmountError::Negative);
        }

        let (whole_str, frac_str) = match input.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (input, None),
        };

        if whole_str.is_empty() || !whole_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(input.to_string()));
        }

        let whole = whole_str
            .parse::<u128>()
            .map_err(|_| AmountError::Overflow)?;

        let frac = match frac_str {
            Some(frac) => {
                if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AmountError::Invalid(input.to_string()));
                }
                if frac.len() > AMOUNT_DECIMALS as usize {
                    return Err(AmountError::TooPrecise {
                        max: AMOUNT_DECIMALS,
                    });
                }
                let padded = format!("{:0<width$}", frac, width = AMOUNT_DECIMALS as usize);
                padded
                    .parse::<u128>()
                    .map_err(|_| AmountError::Invalid(input.to_string()))?
            }
            None => 0,
        };

        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Multiply by a per-unit price and round up to the last fractional digit.
    ///
    /// Rounding up means the buyer is never charged less than the exact cost.
    pub fn mul_ceil(self, price: Amount) -> Result<Amount, AmountError> {
        let product = self.0.checked_mul(price.0).ok_or(AmountError::Overflow)?;
        let rounded = product
            .checked_add(SCALE - 1)
            .ok_or(AmountError::Overflow)?
            / SCALE;
        Ok(Amount(rounded))
    }

    /// Multiply by a rate and truncate to the last fractional digit.
    pub fn mul_floor(self, rate: Amount) -> Result<Amount, AmountError> {
        let product = self.0.checked_mul(rate.0).ok_or(AmountError::Overflow)?;
        Ok(Amount(product / SCALE))
    }

    /// Convert to integer base units of a token with `decimals` decimals.
    ///
    /// Fails if the amount carries more precision than the token supports.
    pub fn to_base_units(self, decimals: u8) -> Result<u64, AmountError> {
        let units = if decimals >= AMOUNT_DECIMALS {
            let factor = pow10(decimals - AMOUNT_DECIMALS)?;
            self.0.checked_mul(factor).ok_or(AmountError::Overflow)?
        } else {
            let divisor = pow10(AMOUNT_DECIMALS - decimals)?;
            if self.0 % divisor != 0 {
                return Err(AmountError::TooPrecise { max: decimals });
            }
            self.0 / divisor
        };
        u64::try_from(units).map_err(|_| AmountError::Overflow)
    }

    /// Like [`Amount::to_base_units`] but drops precision the token cannot hold.
    pub fn to_base_units_floor(self, decimals: u8) -> Result<u64, AmountError> {
        let units = if decimals >= AMOUNT_DECIMALS {
            let factor = pow10(decimals - AMOUNT_DECIMALS)?;
            self.0.checked_mul(factor).ok_or(AmountError::Overflow)?
        } else {
            self.0 / pow10(AMOUNT_DECIMALS - decimals)?
        };
        u64::try_from(units).map_err(|_| AmountError::Overflow)
    }
}

fn pow10(exp: u8) -> Result<u128, AmountError> {
    10u128.checked_pow(exp as u32).ok_or(AmountError::Overflow)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let remainder = self.0 % SCALE;
        if remainder == 0 {
            return write!(f, "{whole}");
        }
        let decimal_str = format!("{:0>width$}", remainder, width = AMOUNT_DECIMALS as usize);
        write!(f, "{}.{}", whole, decimal_str.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal number or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from_whole(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        if v < 0 {
            return Err(E::custom(AmountError::Negative));
        }
        Ok(Amount::from_whole(v as u64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom(AmountError::NotFinite));
        }
        // f64 Display never uses exponent notation.
        Amount::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }
}
