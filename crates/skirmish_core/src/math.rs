//! Fixed-point math utilities for deterministic decisions.
//!
//! Every fractional quantity the engine compares (strength scores,
//! thresholds, tuning knobs) is fixed-point so two agents fed the same
//! snapshot reach the same decision on any CPU.

use fixed::types::I32F32;

/// Fixed-point number type for all engine math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for hand-written fixed-point values.
///
/// Config files are edited by people, so tuning knobs are written as
/// decimals (`aggression_level: 0.75`) and converted once at load time.
/// Out-of-range values are rejected rather than saturated.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| D::Error::custom(format!("value {raw} is out of fixed-point range")))
    }
}

/// Integer division rounding toward zero, returning zero for a zero divisor.
#[must_use]
pub const fn div_or_zero(numerator: i32, denominator: i32) -> i32 {
    if denominator == 0 {
        0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Knob {
        #[serde(with = "fixed_decimal")]
        level: Fixed,
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_decimal_knob_parses_from_ron() {
        let knob: Knob = ron::from_str("(level: 0.5)").unwrap();
        assert_eq!(knob.level, Fixed::from_num(0.5));
    }

    #[test]
    fn test_decimal_knob_rejects_overflow() {
        let parsed: std::result::Result<Knob, _> = ron::from_str("(level: 1e300)");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_div_or_zero() {
        assert_eq!(div_or_zero(7, 2), 3);
        assert_eq!(div_or_zero(7, 0), 0);
    }
}
