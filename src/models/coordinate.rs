// src/models/coordinate.rs
use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::errors::ValueError;

/// Units per whole degree at the stored scale
const SCALE_FACTOR: u64 = 100_000_000;

/// Geographic coordinate stored as a fixed-point decimal
///
/// Holds at most [`Coordinate::MAX_DIGITS`] significant digits, of which
/// [`Coordinate::DECIMAL_PLACES`] follow the decimal point. Values are kept
/// as an integer count of 1e-8 degrees, so text goes in and comes out
/// without any rounding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, SerializeDisplay, DeserializeFromStr,
)]
pub struct Coordinate(i64);

impl Coordinate {
    /// Total number of significant digits
    pub const MAX_DIGITS: u32 = 11;
    /// Number of digits after the decimal point
    pub const DECIMAL_PLACES: u32 = 8;
    /// Number of digits before the decimal point
    pub const INTEGER_DIGITS: u32 = Self::MAX_DIGITS - Self::DECIMAL_PLACES;

    pub const ZERO: Coordinate = Coordinate(0);

    /// Value in degrees as a float, for geometry only
    pub fn to_degrees(&self) -> f64 {
        self.0 as f64 / SCALE_FACTOR as f64
    }

    /// Raw value in units of 1e-8
    pub fn units(&self) -> i64 {
        self.0
    }
}

impl FromStr for Coordinate {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ValueError::Empty);
        }

        let (negative, unsigned) = if let Some(rest) = text.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = text.strip_prefix('+') {
            (false, rest)
        } else {
            (false, text)
        };

        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
        {
            return Err(ValueError::Malformed(text.to_string()));
        }

        // Leading zeros carry no precision, every written decimal place counts
        let int_digits = int_part.trim_start_matches('0');

        if int_digits.len() > Self::INTEGER_DIGITS as usize {
            return Err(ValueError::IntegerDigits {
                value: text.to_string(),
                digits: int_digits.len(),
                max: Self::INTEGER_DIGITS,
            });
        }
        if frac_part.len() > Self::DECIMAL_PLACES as usize {
            return Err(ValueError::DecimalPlaces {
                value: text.to_string(),
                digits: frac_part.len(),
                max: Self::DECIMAL_PLACES,
            });
        }

        let mut units: i64 = 0;
        for b in int_digits.bytes() {
            units = units * 10 + i64::from(b - b'0');
        }
        let frac = frac_part.as_bytes();
        for i in 0..Self::DECIMAL_PLACES as usize {
            let digit = frac.get(i).map_or(0, |b| i64::from(b - b'0'));
            units = units * 10 + digit;
        }

        Ok(Coordinate(if negative { -units } else { units }))
    }
}

impl TryFrom<f64> for Coordinate {
    type Error = ValueError;

    /// Takes the shortest decimal text that round-trips `value`, so floats
    /// that need more than eight decimal places are rejected, not rounded.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ValueError::NonFinite(value));
        }
        value.to_string().parse()
    }
}

impl TryFrom<&str> for Coordinate {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            units / SCALE_FACTOR,
            units % SCALE_FACTOR,
            width = Self::DECIMAL_PLACES as usize
        )
    }
}
