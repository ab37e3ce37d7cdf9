//! Configuration errors.
//!
//! Raised once, when ammo profiles and weapons are loaded or activated.
//! Nothing on the per-tick path returns these.

use thiserror::Error;

use crate::types::AmmoId;

/// Invalid authored data for an ammo profile or weapon.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field}: range min {min} is greater than max {max}")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("{field}: probability {value} is outside [0, 1]")]
    InvalidProbability { field: &'static str, value: f32 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("fragmentation damage multiplier must be at least 1, got {0}")]
    FragmentMultiplier(f32),

    #[error("max fragments must be within 1..={max}, got {value}")]
    FragmentCount { value: u32, max: u32 },

    #[error("accuracy bounds out of order: base {base} <= hip {hip} <= aim {aim} required, all within [0, 1]")]
    AccuracyBounds { base: f32, hip: f32, aim: f32 },

    #[error("falloff curve: {0}")]
    FalloffCurve(&'static str),

    #[error("ammo profile {0:?} is not registered")]
    MissingAmmo(AmmoId),

    #[error("{field} must hold at least one round")]
    EmptyCount { field: &'static str },

    #[error("failed to parse RON: {0}")]
    Parse(String),
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Checks `min <= max`.
pub(crate) fn check_range(field: &'static str, range: [f32; 2]) -> Result<(), ConfigError> {
    if range[0] > range[1] || range[0].is_nan() || range[1].is_nan() {
        return Err(ConfigError::InvertedRange {
            field,
            min: range[0],
            max: range[1],
        });
    }
    Ok(())
}

/// Checks a probability lies in `[0, 1]`.
pub(crate) fn check_probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if rand_distr::Bernoulli::new(value as f64).is_err() || value.is_nan() {
        return Err(ConfigError::InvalidProbability { field, value });
    }
    Ok(())
}

pub(crate) fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value >= 0.0) {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

pub(crate) fn check_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_checks() {
        assert!(check_range("damage", [1.0, 2.0]).is_ok());
        assert!(check_range("damage", [2.0, 2.0]).is_ok());
        assert_eq!(
            check_range("damage", [3.0, 2.0]),
            Err(ConfigError::InvertedRange {
                field: "damage",
                min: 3.0,
                max: 2.0
            })
        );
    }

    #[test]
    fn test_probability_checks() {
        assert!(check_probability("chance", 0.0).is_ok());
        assert!(check_probability("chance", 1.0).is_ok());
        assert!(check_probability("chance", 1.5).is_err());
        assert!(check_probability("chance", -0.1).is_err());
        assert!(check_probability("chance", f32::NAN).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::FragmentCount { value: 9, max: 4 };
        assert_eq!(err.to_string(), "max fragments must be within 1..=4, got 9");
    }
}
