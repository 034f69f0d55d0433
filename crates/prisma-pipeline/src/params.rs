//! Parameter derivation shared by the operation families.
//!
//! Each family derives its concrete algorithm parameters (kernel
//! sizes, thresholds, radii) from the effective intensity unless the
//! step carries an explicit override. The helpers here implement the
//! common arithmetic: scaling, rounding, odd-size normalization and
//! clamping into the valid range.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{MAX_ITERATIONS, ProcessingDefaults, clamp_intensity};

/// An untyped parameter value, as supplied by a textual step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integral value, e.g. `radius=2`.
    Int(i64),
    /// Fractional value, e.g. `intensity=1.5`.
    Float(f64),
    /// Anything else.
    Text(String),
}

impl ParamValue {
    /// Parse a raw string: integers first, then floats, else text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            Self::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            Self::Float(f)
        } else {
            Self::Text(raw.to_owned())
        }
    }

    /// Numeric view of the value. Text yields `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            Self::Float(_) | Self::Text(_) => None,
        }
    }

    /// Integral view of the value, rounding floats. Text yields `None`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.round() as i64),
            Self::Float(_) | Self::Text(_) => None,
        }
    }

    /// Non-negative integral view, saturating at `u32::MAX`.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().map(saturating_u32)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Untyped parameter bag keyed by name.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// `round(base * intensity)` as a signed integer.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn scaled(base: f64, intensity: f64) -> i64 {
    (base * intensity).round() as i64
}

/// Bump an even size to the next odd one.
#[must_use]
pub const fn force_odd(size: u32) -> u32 {
    if size % 2 == 0 { size + 1 } else { size }
}

/// Odd kernel size: the override if present, otherwise
/// `max(min, round(base * intensity))`, then forced odd and clamped
/// into `[min, max]`.
///
/// `min` and `max` must both be odd.
#[must_use]
pub fn odd_kernel_size(
    override_size: Option<u32>,
    base: f64,
    intensity: f64,
    min: u32,
    max: u32,
) -> u32 {
    let raw = override_size.unwrap_or_else(|| saturating_u32(scaled(base, intensity)).max(min));
    force_odd(raw).clamp(min, max)
}

/// Clamp a signed value into `u32`.
#[must_use]
pub fn saturating_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Clamp a signed value into `u8`.
#[must_use]
pub fn saturating_u8(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

/// Effective intensity: the step override (clamped) or the default.
#[must_use]
pub fn effective_intensity(override_intensity: Option<f64>, defaults: ProcessingDefaults) -> f64 {
    override_intensity.map_or(defaults.intensity, clamp_intensity)
}

/// Effective repeat count: the step override (clamped) or the default.
#[must_use]
pub fn effective_iterations(override_iterations: Option<u32>, defaults: ProcessingDefaults) -> u32 {
    override_iterations.map_or(defaults.iterations, |n| n.clamp(1, MAX_ITERATIONS))
}
