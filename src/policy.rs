//! Progressive-overload decision tables
//!
//! Two independent tables keyed by progression mode. Linear mode holds a
//! fixed rep target and moves weight on difficulty once the target is hit.
//! Double mode walks the tracked rep target up through the programmed range
//! and resets it to the range minimum whenever weight advances. Set count
//! passes through both tables unchanged; the only set-count rule lives in
//! the substitution adjustment below.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{Difficulty, ProgressionMode, ProgressionResult, ProgressionSnapshot};
use crate::reps::{RepsRange, DEFAULT_RANGE};

/// Minimum equipment increment assumed when neither the instance nor its
/// chain carries one. 2.5 is the smallest common plate pair.
pub const DEFAULT_INCREMENT: Decimal = dec!(2.5);

/// Set-count bounds for the substitution adjustment rule.
pub const MIN_SETS: u32 = 1;
pub const MAX_SETS: u32 = 5;

/// Engine fallbacks the orchestrator uses when an instance and its chain
/// carry no explicit values. Resolved from the application config at
/// startup; the constants above are the shipped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDefaults {
    /// Increment when neither the instance nor its chain has one
    pub increment: Decimal,

    /// Range assumed when a stored rep spec is malformed
    pub fallback_range: RepsRange,

    /// Set-count floor for the substitution adjustment
    pub min_sets: u32,

    /// Set-count cap for the substitution adjustment
    pub max_sets: u32,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            increment: DEFAULT_INCREMENT,
            fallback_range: DEFAULT_RANGE,
            min_sets: MIN_SETS,
            max_sets: MAX_SETS,
        }
    }
}

/// Stateless progression calculator.
pub struct ProgressionPolicy;

impl ProgressionPolicy {
    /// Compute the next weight/reps/sets for an exercise chain from one
    /// completed session's snapshot. Pure: no store access, no clock.
    pub fn compute_progression(snapshot: &ProgressionSnapshot) -> ProgressionResult {
        match snapshot.mode {
            ProgressionMode::Linear => Self::linear(snapshot),
            ProgressionMode::Double => Self::double(snapshot),
        }
    }

    /// Linear mode: fixed rep target `T`. The user must repeat the weight
    /// until executing `T` reps; only then does difficulty move the weight.
    fn linear(snapshot: &ProgressionSnapshot) -> ProgressionResult {
        let target = snapshot.tracked_reps;
        let mut weight = snapshot.weight;
        let mut deload = false;

        if snapshot.executed_reps >= target {
            match snapshot.difficulty {
                Difficulty::VeryEasy => {
                    weight += snapshot.increment * dec!(2);
                }
                Difficulty::Easy | Difficulty::Moderate => {
                    weight += snapshot.increment;
                }
                Difficulty::Hard => {}
                Difficulty::VeryHard => {
                    weight -= snapshot.increment;
                    deload = true;
                }
            }
        }

        ProgressionResult {
            weight: Self::floor_weight(weight),
            tracked_reps: target,
            sets: snapshot.sets,
            deload,
            mode: ProgressionMode::Linear,
        }
    }

    /// Double mode: rep range `[min, max]` with tracked target `R`.
    /// Reps climb before weight moves; any weight advance resets `R` to the
    /// range minimum.
    fn double(snapshot: &ProgressionSnapshot) -> ProgressionResult {
        let range = snapshot.range;
        let target = range.clamp(snapshot.tracked_reps);
        let executed = snapshot.executed_reps;
        let mut weight = snapshot.weight;
        let mut reps = target;
        let mut deload = false;

        match snapshot.difficulty {
            Difficulty::VeryEasy => {
                weight += snapshot.increment * dec!(2);
                reps = range.min;
            }
            Difficulty::Easy => {
                if executed + 1 >= range.max {
                    weight += snapshot.increment;
                    reps = range.min;
                } else {
                    reps = range.clamp(target + 1);
                }
            }
            Difficulty::Moderate => {
                if executed >= range.max {
                    weight += snapshot.increment;
                    reps = range.min;
                } else if executed >= target {
                    reps = range.clamp(target + 1);
                }
            }
            Difficulty::Hard => {}
            Difficulty::VeryHard => {
                weight -= snapshot.increment;
                deload = true;
                reps = range.clamp(target.saturating_sub(1));
            }
        }

        ProgressionResult {
            weight: Self::floor_weight(weight),
            tracked_reps: reps,
            sets: snapshot.sets,
            deload,
            mode: ProgressionMode::Double,
        }
    }

    fn floor_weight(weight: Decimal) -> Decimal {
        if weight < Decimal::ZERO {
            Decimal::ZERO
        } else {
            weight
        }
    }

    /// Series-only adjustment for substituted instances. Weight and reps are
    /// deliberately frozen when an exercise was swapped for a single session;
    /// only the set count moves, by fatigue threshold.
    ///
    /// On the 1-5 fatigue scale: <= 2 adds a set (capped at the configured
    /// maximum), >= 4 drops one (floored at the configured minimum), 3 holds.
    pub fn adjust_substituted_sets(sets: u32, fatigue: u8, defaults: &PolicyDefaults) -> u32 {
        if fatigue <= 2 {
            (sets + 1).min(defaults.max_sets)
        } else if fatigue >= 4 {
            sets.saturating_sub(1).max(defaults.min_sets)
        } else {
            sets
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reps::RepsRange;

    fn snapshot(
        weight: Decimal,
        range: RepsRange,
        mode: ProgressionMode,
        tracked: u32,
        executed: u32,
        difficulty: Difficulty,
    ) -> ProgressionSnapshot {
        ProgressionSnapshot {
            weight,
            range,
            mode,
            tracked_reps: tracked,
            executed_reps: executed,
            sets: 3,
            increment: dec!(2.5),
            difficulty,
            fatigue: Some(3),
            pain: None,
        }
    }

    fn linear(weight: Decimal, target: u32, executed: u32, difficulty: Difficulty) -> ProgressionSnapshot {
        snapshot(
            weight,
            RepsRange::new(target, target),
            ProgressionMode::Linear,
            target,
            executed,
            difficulty,
        )
    }

    fn double(weight: Decimal, tracked: u32, executed: u32, difficulty: Difficulty) -> ProgressionSnapshot {
        snapshot(
            weight,
            RepsRange::new(8, 12),
            ProgressionMode::Double,
            tracked,
            executed,
            difficulty,
        )
    }

    #[test]
    fn test_linear_below_target_holds_everything() {
        // Executing target - 1 never advances weight, whatever the difficulty
        for difficulty in [
            Difficulty::VeryEasy,
            Difficulty::Easy,
            Difficulty::Moderate,
            Difficulty::Hard,
            Difficulty::VeryHard,
        ] {
            let result = ProgressionPolicy::compute_progression(&linear(dec!(50), 10, 9, difficulty));
            assert_eq!(result.weight, dec!(50));
            assert_eq!(result.tracked_reps, 10);
            assert!(!result.deload);
        }
    }

    #[test]
    fn test_linear_very_easy_double_increment() {
        let result = ProgressionPolicy::compute_progression(&linear(dec!(50), 10, 10, Difficulty::VeryEasy));
        assert_eq!(result.weight, dec!(55));
        assert_eq!(result.sets, 3);
    }

    #[test]
    fn test_linear_easy_and_moderate_single_increment() {
        for difficulty in [Difficulty::Easy, Difficulty::Moderate] {
            let result = ProgressionPolicy::compute_progression(&linear(dec!(50), 10, 12, difficulty));
            assert_eq!(result.weight, dec!(52.5));
        }
    }

    #[test]
    fn test_linear_hard_holds_weight_exactly() {
        let result = ProgressionPolicy::compute_progression(&linear(dec!(50), 10, 10, Difficulty::Hard));
        assert_eq!(result.weight, dec!(50));
        assert!(!result.deload);
    }

    #[test]
    fn test_linear_deload() {
        // Fixed target 10, executed 10, very hard, increment 2.5, weight 50
        let result = ProgressionPolicy::compute_progression(&linear(dec!(50), 10, 10, Difficulty::VeryHard));
        assert_eq!(result.weight, dec!(47.5));
        assert!(result.deload);
    }

    #[test]
    fn test_linear_deload_floors_at_zero() {
        let result = ProgressionPolicy::compute_progression(&linear(dec!(1), 10, 10, Difficulty::VeryHard));
        assert_eq!(result.weight, Decimal::ZERO);
        assert!(result.deload);
    }

    #[test]
    fn test_double_very_easy_jumps_and_resets() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 10, 11, Difficulty::VeryEasy));
        assert_eq!(result.weight, dec!(45));
        assert_eq!(result.tracked_reps, 8);
    }

    #[test]
    fn test_double_easy_near_max_advances_weight() {
        // executed >= max - 1
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 10, 11, Difficulty::Easy));
        assert_eq!(result.weight, dec!(42.5));
        assert_eq!(result.tracked_reps, 8);
    }

    #[test]
    fn test_double_easy_below_max_bumps_reps() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 9, 9, Difficulty::Easy));
        assert_eq!(result.weight, dec!(40));
        assert_eq!(result.tracked_reps, 10);
    }

    #[test]
    fn test_double_moderate_advance_reps() {
        // executed(10) < max(12) but >= tracked(10): reps climb, weight holds
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 10, 10, Difficulty::Moderate));
        assert_eq!(result.weight, dec!(40));
        assert_eq!(result.tracked_reps, 11);
    }

    #[test]
    fn test_double_moderate_weight_jump_at_max() {
        // executed >= max: weight advances, reps reset to min
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 10, 12, Difficulty::Moderate));
        assert_eq!(result.weight, dec!(42.5));
        assert_eq!(result.tracked_reps, 8);
    }

    #[test]
    fn test_double_moderate_below_target_holds() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 10, 9, Difficulty::Moderate));
        assert_eq!(result.weight, dec!(40));
        assert_eq!(result.tracked_reps, 10);
    }

    #[test]
    fn test_double_hard_holds_everything() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 11, 12, Difficulty::Hard));
        assert_eq!(result.weight, dec!(40));
        assert_eq!(result.tracked_reps, 11);
        assert!(!result.deload);
    }

    #[test]
    fn test_double_very_hard_deload_steps_reps_down() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 10, 7, Difficulty::VeryHard));
        assert_eq!(result.weight, dec!(37.5));
        assert_eq!(result.tracked_reps, 9);
        assert!(result.deload);
    }

    #[test]
    fn test_double_very_hard_reps_floor_at_range_min() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 8, 5, Difficulty::VeryHard));
        assert_eq!(result.tracked_reps, 8);
    }

    #[test]
    fn test_double_reps_never_exceed_max() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(40), 12, 12, Difficulty::Easy));
        assert!(result.tracked_reps <= 12);
        assert!(result.tracked_reps >= 8);
    }

    #[test]
    fn test_double_weight_floor() {
        let result = ProgressionPolicy::compute_progression(&double(dec!(2), 10, 7, Difficulty::VeryHard));
        assert_eq!(result.weight, Decimal::ZERO);
    }

    #[test]
    fn test_sets_pass_through() {
        let mut snap = double(dec!(40), 10, 12, Difficulty::Moderate);
        snap.sets = 4;
        let result = ProgressionPolicy::compute_progression(&snap);
        assert_eq!(result.sets, 4);
    }

    #[test]
    fn test_substituted_sets_low_fatigue_adds() {
        let defaults = PolicyDefaults::default();
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(3, 1, &defaults), 4);
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(3, 2, &defaults), 4);
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(5, 1, &defaults), 5);
    }

    #[test]
    fn test_substituted_sets_high_fatigue_drops() {
        let defaults = PolicyDefaults::default();
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(3, 5, &defaults), 2);
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(3, 4, &defaults), 2);
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(1, 5, &defaults), 1);
    }

    #[test]
    fn test_substituted_sets_moderate_holds() {
        let defaults = PolicyDefaults::default();
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(3, 3, &defaults), 3);
    }

    #[test]
    fn test_substituted_sets_respect_configured_bounds() {
        let defaults = PolicyDefaults {
            min_sets: 2,
            max_sets: 4,
            ..PolicyDefaults::default()
        };
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(4, 1, &defaults), 4);
        assert_eq!(ProgressionPolicy::adjust_substituted_sets(2, 5, &defaults), 2);
    }
}
