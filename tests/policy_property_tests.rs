//! Property tests for the progression tables and the rep-range grammar.

use proptest::prelude::*;
use rust_decimal::Decimal;

use liftrs::models::{Difficulty, ProgressionMode, ProgressionSnapshot};
use liftrs::policy::{PolicyDefaults, ProgressionPolicy, MAX_SETS, MIN_SETS};
use liftrs::reps::RepsRange;

fn any_difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::VeryEasy),
        Just(Difficulty::Easy),
        Just(Difficulty::Moderate),
        Just(Difficulty::Hard),
        Just(Difficulty::VeryHard),
    ]
}

fn any_mode() -> impl Strategy<Value = ProgressionMode> {
    prop_oneof![Just(ProgressionMode::Linear), Just(ProgressionMode::Double)]
}

fn any_snapshot() -> impl Strategy<Value = ProgressionSnapshot> {
    (
        0u32..500,
        1u32..30,
        0u32..15,
        (1u32..30, 0u32..40),
        1u32..6,
        1u32..20,
        any_mode(),
        any_difficulty(),
        0u8..=5,
    )
        .prop_map(
            |(weight, min, span, (tracked, executed), sets, increment, mode, difficulty, fatigue)| {
                ProgressionSnapshot {
                    weight: Decimal::from(weight),
                    range: RepsRange::new(min, min + span),
                    mode,
                    tracked_reps: tracked,
                    executed_reps: executed,
                    sets,
                    increment: Decimal::from(increment),
                    difficulty,
                    fatigue: Some(fatigue),
                    pain: None,
                }
            },
        )
}

proptest! {
    /// Deloads can never push a weight below zero.
    #[test]
    fn weight_never_negative(snapshot in any_snapshot()) {
        let result = ProgressionPolicy::compute_progression(&snapshot);
        prop_assert!(result.weight >= Decimal::ZERO);
    }

    /// Double mode keeps the tracked target inside the programmed range.
    #[test]
    fn double_target_stays_in_range(mut snapshot in any_snapshot()) {
        snapshot.mode = ProgressionMode::Double;
        let result = ProgressionPolicy::compute_progression(&snapshot);
        prop_assert!(result.tracked_reps >= snapshot.range.min);
        prop_assert!(result.tracked_reps <= snapshot.range.max);
    }

    /// Linear mode never touches the rep target; only weight moves.
    #[test]
    fn linear_target_is_fixed(mut snapshot in any_snapshot()) {
        snapshot.mode = ProgressionMode::Linear;
        let result = ProgressionPolicy::compute_progression(&snapshot);
        prop_assert_eq!(result.tracked_reps, snapshot.tracked_reps);
    }

    /// Set counts pass through the tables unchanged.
    #[test]
    fn sets_pass_through(snapshot in any_snapshot()) {
        let result = ProgressionPolicy::compute_progression(&snapshot);
        prop_assert_eq!(result.sets, snapshot.sets);
    }

    /// Below the target, linear mode holds weight for every rating.
    #[test]
    fn linear_missed_target_holds(
        mut snapshot in any_snapshot(),
        shortfall in 1u32..10,
    ) {
        snapshot.mode = ProgressionMode::Linear;
        snapshot.tracked_reps = snapshot.executed_reps + shortfall;
        let result = ProgressionPolicy::compute_progression(&snapshot);
        prop_assert_eq!(result.weight, snapshot.weight);
        prop_assert!(!result.deload);
    }

    /// The substitution rule keeps set counts within the configured bounds.
    #[test]
    fn substituted_sets_bounded(sets in MIN_SETS..=MAX_SETS, fatigue in 0u8..=5) {
        let defaults = PolicyDefaults::default();
        let adjusted = ProgressionPolicy::adjust_substituted_sets(sets, fatigue, &defaults);
        prop_assert!(adjusted >= MIN_SETS);
        prop_assert!(adjusted <= MAX_SETS);
    }

    /// Formatting a parsed spec and reparsing it reaches a fixed point.
    #[test]
    fn parse_format_round_trip(min in 1u32..50, span in 0u32..50) {
        let spec = if span == 0 {
            format!("{}", min)
        } else {
            format!("{}-{}", min, min + span)
        };
        let parsed = RepsRange::parse(&spec).unwrap();
        let reparsed = RepsRange::parse(&parsed.to_string()).unwrap();
        prop_assert_eq!(parsed, reparsed);
    }

    /// Malformed specs never panic; they parse to an error.
    #[test]
    fn arbitrary_specs_never_panic(spec in "\\PC{0,12}") {
        let _ = RepsRange::parse(&spec);
        let _ = RepsRange::parse_or_default(&spec);
    }
}
