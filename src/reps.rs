//! Programmed-repetitions specification model
//!
//! A rep spec is either a fixed count (`"10"`) or a min-max range (`"8-12"`).
//! The presence of a `-` selects double progression for the lifetime of the
//! exercise chain; a fixed spec selects linear progression.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProgressionError;
use crate::models::ProgressionMode;

/// Default range used when a stored spec turns out to be malformed at
/// calculation time. Program authoring must reject bad specs loudly; this
/// fallback only keeps a completion from crashing on legacy data.
pub const DEFAULT_RANGE: RepsRange = RepsRange { min: 8, max: 12 };

/// Parsed repetitions specification. `min == max` for fixed targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepsRange {
    pub min: u32,
    pub max: u32,
}

impl RepsRange {
    pub fn new(min: u32, max: u32) -> Self {
        RepsRange { min, max }
    }

    /// Parse a rep spec string. Splits on `-` for ranges; a bare number
    /// yields `min == max`. Whitespace around components is tolerated.
    pub fn parse(spec: &str) -> Result<Self, ProgressionError> {
        let invalid = || ProgressionError::InvalidRepsSpec {
            spec: spec.to_string(),
        };

        if let Some((lo, hi)) = spec.split_once('-') {
            let min: u32 = lo.trim().parse().map_err(|_| invalid())?;
            let max: u32 = hi.trim().parse().map_err(|_| invalid())?;
            if min == 0 || max < min {
                return Err(invalid());
            }
            Ok(RepsRange { min, max })
        } else {
            let value: u32 = spec.trim().parse().map_err(|_| invalid())?;
            if value == 0 {
                return Err(invalid());
            }
            Ok(RepsRange {
                min: value,
                max: value,
            })
        }
    }

    /// Defensive parse used on the calculation path: malformed input falls
    /// back to the supplied range instead of failing the completion.
    pub fn parse_or(spec: &str, fallback: RepsRange) -> Self {
        Self::parse(spec).unwrap_or_else(|_| {
            tracing::warn!(spec, %fallback, "Malformed reps spec, falling back");
            fallback
        })
    }

    /// [`RepsRange::parse_or`] with the shipped [`DEFAULT_RANGE`].
    pub fn parse_or_default(spec: &str) -> Self {
        Self::parse_or(spec, DEFAULT_RANGE)
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    /// Clamp a rep target into this range.
    pub fn clamp(&self, reps: u32) -> u32 {
        reps.clamp(self.min, self.max)
    }
}

impl fmt::Display for RepsRange {
    /// Left-inverse of [`RepsRange::parse`]: `"n"` when the range collapses,
    /// `"min-max"` otherwise. A stored `"5-5"` normalizes to `"5"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// True iff the spec selects double progression (contains a `-`).
///
/// Mode is decided on the raw string, not the parsed range: `"5-5"` is
/// double progression even though its parsed range collapses.
pub fn is_double_progression(spec: &str) -> bool {
    spec.contains('-')
}

/// Progression mode for a raw spec string.
pub fn progression_mode(spec: &str) -> ProgressionMode {
    if is_double_progression(spec) {
        ProgressionMode::Double
    } else {
        ProgressionMode::Linear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed() {
        let range = RepsRange::parse("10").unwrap();
        assert_eq!(range, RepsRange::new(10, 10));
        assert!(range.is_fixed());
    }

    #[test]
    fn test_parse_range() {
        let range = RepsRange::parse("8-12").unwrap();
        assert_eq!(range, RepsRange::new(8, 12));
        assert!(!range.is_fixed());
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        assert_eq!(RepsRange::parse(" 8 - 12 ").unwrap(), RepsRange::new(8, 12));
        assert_eq!(RepsRange::parse(" 10 ").unwrap(), RepsRange::new(10, 10));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RepsRange::parse("abc").is_err());
        assert!(RepsRange::parse("8-x").is_err());
        assert!(RepsRange::parse("").is_err());
        assert!(RepsRange::parse("0").is_err());
        assert!(RepsRange::parse("12-8").is_err());
    }

    #[test]
    fn test_parse_or_default_falls_back() {
        assert_eq!(RepsRange::parse_or_default("nonsense"), DEFAULT_RANGE);
        assert_eq!(RepsRange::parse_or_default("6-10"), RepsRange::new(6, 10));
    }

    #[test]
    fn test_parse_or_uses_supplied_fallback() {
        let fallback = RepsRange::new(5, 8);
        assert_eq!(RepsRange::parse_or("nonsense", fallback), fallback);
        assert_eq!(RepsRange::parse_or("6-10", fallback), RepsRange::new(6, 10));
    }

    #[test]
    fn test_format_round_trip() {
        for spec in ["10", "8-12", "5", "1-20"] {
            let range = RepsRange::parse(spec).unwrap();
            assert_eq!(range.to_string(), spec);
        }
    }

    #[test]
    fn test_format_normalizes_collapsed_range() {
        // "5-5" parses as a collapsed range and formats back as "5"
        let range = RepsRange::parse("5-5").unwrap();
        assert_eq!(range.to_string(), "5");
    }

    #[test]
    fn test_mode_selection() {
        assert!(!is_double_progression("10"));
        assert!(is_double_progression("8-12"));
        assert!(is_double_progression("5-5"));
        assert_eq!(progression_mode("10"), ProgressionMode::Linear);
        assert_eq!(progression_mode("8-12"), ProgressionMode::Double);
    }

    #[test]
    fn test_clamp() {
        let range = RepsRange::new(8, 12);
        assert_eq!(range.clamp(7), 8);
        assert_eq!(range.clamp(10), 10);
        assert_eq!(range.clamp(13), 12);
    }
}
