//! Fixed-point math utilities for deterministic invasion resolution.
//!
//! Every power, ratio and percentage in the engine is computed with
//! fixed-point arithmetic so that identical inputs produce bit-identical
//! outcomes on every platform. Unit counts stay integral (`u64`) and are
//! converted at the edges with the saturating helpers below.

use fixed::types::I32F32;

use crate::error::{GameError, Result};

/// Fixed-point number type for all invasion math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for hand-written data files.
///
/// Rule files are edited by people, so fixed-point values are written as
/// plain decimals (`4.5`) and converted once on load.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("{value} does not fit a fixed-point value")))
    }
}

/// Serde support for optional decimals in hand-written data files.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize an optional fixed-point number as a decimal.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_num::<f64>()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|value| {
                Fixed::checked_from_num(value).ok_or_else(|| {
                    D::Error::custom(format!("{value} does not fit a fixed-point value"))
                })
            })
            .transpose()
    }
}

/// Convert a unit or resource count into a fixed-point number.
#[must_use]
pub fn fx(count: u64) -> Fixed {
    Fixed::saturating_from_num(count)
}

/// Convert a count, failing when it does not fit the fixed-point range.
pub fn checked_fx(count: u64) -> Result<Fixed> {
    Fixed::checked_from_num(count).ok_or_else(|| GameError::Overflow(format!("{count} does not fit")))
}

/// `a × b`, failing instead of wrapping.
pub fn checked_mul(a: Fixed, b: Fixed) -> Result<Fixed> {
    a.checked_mul(b)
        .ok_or_else(|| GameError::Overflow(format!("{a} × {b}")))
}

/// `a + b`, failing instead of wrapping.
pub fn checked_add(a: Fixed, b: Fixed) -> Result<Fixed> {
    a.checked_add(b)
        .ok_or_else(|| GameError::Overflow(format!("{a} + {b}")))
}

/// Convert a signed integer into a fixed-point number.
#[must_use]
pub fn fxi(value: i64) -> Fixed {
    Fixed::saturating_from_num(value)
}

/// Turn a percentage into a fraction (`4.5` becomes `0.045`).
#[must_use]
pub fn percent(value: Fixed) -> Fixed {
    value / Fixed::from_num(100)
}

/// Exact fraction `numerator / denominator`, zero when the denominator is zero.
#[must_use]
pub fn ratio(numerator: Fixed, denominator: Fixed) -> Fixed {
    if denominator == Fixed::ZERO {
        Fixed::ZERO
    } else {
        numerator / denominator
    }
}

/// Round down to a non-negative count.
#[must_use]
pub fn floor_count(value: Fixed) -> u64 {
    if value <= Fixed::ZERO {
        0
    } else {
        value.floor().saturating_to_num::<u64>()
    }
}

/// Round up to a non-negative count.
#[must_use]
pub fn ceil_count(value: Fixed) -> u64 {
    if value <= Fixed::ZERO {
        0
    } else {
        value.ceil().saturating_to_num::<u64>()
    }
}

/// Round to the nearest non-negative count, ties away from zero.
#[must_use]
pub fn round_count(value: Fixed) -> u64 {
    if value <= Fixed::ZERO {
        0
    } else {
        value.round().saturating_to_num::<u64>()
    }
}

/// Round to the nearest signed integer, ties away from zero.
#[must_use]
pub fn round_signed(value: Fixed) -> i64 {
    value.round().saturating_to_num::<i64>()
}

/// `value × numerator / denominator` without intermediate overflow.
///
/// Exact whenever the result is representable; saturates otherwise.
#[must_use]
pub fn scale(value: Fixed, numerator: u64, denominator: u64) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    let bits = i128::from(value.to_bits()) * i128::from(numerator) / i128::from(denominator);
    Fixed::from_bits(i64::try_from(bits).unwrap_or(if bits < 0 { i64::MIN } else { i64::MAX }))
}

/// Clamp a fixed-point value into `[low, high]`.
#[must_use]
pub fn clamp(value: Fixed, low: Fixed, high: Fixed) -> Fixed {
    value.max(low).min(high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_helpers() {
        let value = Fixed::from_num(2.5);
        assert_eq!(floor_count(value), 2);
        assert_eq!(ceil_count(value), 3);
        assert_eq!(round_count(value), 3);
        assert_eq!(round_signed(Fixed::from_num(-2.5)), -3);
    }

    #[test]
    fn test_negative_values_floor_to_zero_counts() {
        assert_eq!(floor_count(Fixed::from_num(-4)), 0);
        assert_eq!(ceil_count(Fixed::from_num(-0.5)), 0);
    }

    #[test]
    fn test_ratio_guards_zero_denominator() {
        assert_eq!(ratio(fx(10), Fixed::ZERO), Fixed::ZERO);
        assert_eq!(ratio(fx(10), fx(4)), Fixed::from_num(2.5));
    }

    #[test]
    fn test_scale_is_exact() {
        assert_eq!(scale(fx(600), 950, 1000), Fixed::from_num(570));
        assert_eq!(scale(fx(10), 4, 3) * Fixed::from_num(3), fx(40) - Fixed::from_bits(2));
        assert_eq!(scale(fx(10), 1, 0), Fixed::ZERO);
    }

    #[test]
    fn test_checked_helpers_report_overflow() {
        assert_eq!(checked_mul(fx(1000), fx(10)).expect("fits"), fx(10_000));
        assert!(matches!(checked_mul(fx(300_000_000), fx(10)), Err(GameError::Overflow(_))));
        assert!(matches!(checked_add(Fixed::MAX, Fixed::ONE), Err(GameError::Overflow(_))));
        assert!(checked_fx(3_000_000_000).is_err());
        assert_eq!(checked_fx(2_000_000_000).expect("fits"), fx(2_000_000_000));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(Fixed::from_num(50)), Fixed::from_num(0.5));
    }

    #[test]
    fn test_fixed_serde_roundtrip_is_exact() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper(#[serde(with = "fixed_serde")] Fixed);

        let original = Fixed::from_num(1) / Fixed::from_num(3);
        let bytes = bincode::serialize(&Wrapper(original)).expect("serialize");
        let Wrapper(restored) = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(original, restored);
    }

    #[test]
    fn test_decimal_serde_reads_ron_decimals() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "decimal_serde")]
            value: Fixed,
        }

        let parsed: Wrapper = ron::from_str("(value: 4.5)").expect("parse");
        assert_eq!(parsed.value, Fixed::from_num(4.5));
    }
}
