use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reps::RepsRange;

/// Qualitative difficulty reported by the user after completing an exercise.
///
/// This is a closed set: free-form strings coming from storage or the CLI are
/// normalized through [`Difficulty::from_str`] at the adapter boundary, never
/// inside the policy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    VeryEasy,
    Easy,
    Moderate,
    Hard,
    VeryHard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::VeryEasy => write!(f, "very_easy"),
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Moderate => write!(f, "moderate"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::VeryHard => write!(f, "very_hard"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    /// Accepts both the English snake-case form and the legacy Portuguese
    /// wire strings the original mobile client persisted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "very_easy" | "muito_facil" => Ok(Difficulty::VeryEasy),
            "easy" | "facil" => Ok(Difficulty::Easy),
            "moderate" | "moderado" => Ok(Difficulty::Moderate),
            "hard" | "dificil" => Ok(Difficulty::Hard),
            "very_hard" | "muito_dificil" => Ok(Difficulty::VeryHard),
            _ => Err(format!("Unknown difficulty rating: {}", s)),
        }
    }
}

/// Stable identity of an exercise across its scheduled occurrences.
///
/// An instance chains to its future occurrences through the canonical
/// exercise id when present, else through a user-created substitute id.
/// When neither exists the exercise cannot be chained and progression is
/// skipped. Derived once per workflow via [`ChainIdentity::of`] and passed
/// through, never re-derived at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainIdentity {
    /// Canonical exercise from the program catalog
    Original(String),
    /// User-defined substitute exercise
    Custom(String),
    /// Fully custom instance with no stable identity
    None,
}

impl ChainIdentity {
    pub fn of(instance: &ExerciseInstance) -> Self {
        if let Some(id) = &instance.original_exercise_id {
            ChainIdentity::Original(id.clone())
        } else if let Some(id) = &instance.custom_substitute_id {
            ChainIdentity::Custom(id.clone())
        } else {
            ChainIdentity::None
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ChainIdentity::None)
    }
}

/// One scheduled occurrence of an exercise within one workout within one
/// program enrollment.
///
/// Instances are created when an enrollment is materialized (one per exercise
/// per scheduled week) and mutated in place as progression results are
/// written onto them ahead of the user reaching them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseInstance {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Primary muscle group
    pub muscle_group: Option<String>,

    /// Canonical exercise id; `None` when fully custom or substituted
    pub original_exercise_id: Option<String>,

    /// User-defined substitute exercise id
    pub custom_substitute_id: Option<String>,

    /// Set count, always >= 1
    pub sets: u32,

    /// Current target weight
    pub weight: Option<Decimal>,

    /// Programmed repetitions spec: fixed (`"10"`) or range (`"8-12"`)
    pub programmed_reps: String,

    /// Currently tracked target rep count for the progression policy.
    /// `None` exactly when the exercise chain has never been completed —
    /// this defines "first week" for the chain.
    pub tracked_reps: Option<u32>,

    /// Minimum equipment weight increment
    pub min_increment: Option<Decimal>,

    /// Whether the increment has been explicitly configured by the user
    pub increment_configured: bool,

    /// Completed flag
    pub completed: bool,

    /// Whether this instance was substituted for the session.
    /// Substituted instances use the series-only adjustment rule.
    pub substituted: bool,

    /// Difficulty feedback captured at completion
    pub difficulty: Option<Difficulty>,

    /// Fatigue rating (1-5) captured at completion
    pub fatigue: Option<u8>,

    /// Pain rating (1-5) captured at completion. Recorded but currently
    /// consumed by no decision table.
    pub pain: Option<u8>,

    /// Owning workout
    pub workout_id: String,

    /// Owning program enrollment
    pub enrollment_id: String,

    /// Creation timestamp of the owning workout; chronological ordering key
    /// for future occurrences
    pub workout_created_at: DateTime<Utc>,
}

/// One logged set attempt within an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    /// Unique identifier
    pub id: String,

    /// Owning exercise instance
    pub instance_id: String,

    /// Ordinal within the instance, starting at 1
    pub set_number: u32,

    /// Weight used for this set
    pub weight: Option<Decimal>,

    /// Repetitions executed
    pub reps: u32,

    /// Completed flag
    pub completed: bool,
}

/// Progression mode selected by the programmed-reps spec for the lifetime of
/// an exercise chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionMode {
    /// Fixed rep target: weight moves, reps stay
    Linear,
    /// Rep range: reps climb toward the range max before weight moves
    Double,
}

impl fmt::Display for ProgressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressionMode::Linear => write!(f, "linear"),
            ProgressionMode::Double => write!(f, "double"),
        }
    }
}

/// Inputs to one progression decision. Constructed fresh per calculation,
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionSnapshot {
    /// Current target weight (0 when never set)
    pub weight: Decimal,

    /// Programmed rep range; `min == max` for fixed targets
    pub range: RepsRange,

    /// Mode selected from the raw spec string (a `"5-5"` spec is still
    /// double progression even though the parsed range collapses)
    pub mode: ProgressionMode,

    /// Currently tracked target rep count
    pub tracked_reps: u32,

    /// Repetitions executed in the worst completed set
    pub executed_reps: u32,

    /// Current set count
    pub sets: u32,

    /// Minimum equipment increment to move weight by
    pub increment: Decimal,

    /// Difficulty feedback
    pub difficulty: Difficulty,

    /// Fatigue rating (1-5)
    pub fatigue: Option<u8>,

    /// Pain rating (1-5); carried but inert in the current tables
    pub pain: Option<u8>,
}

/// Output of one progression decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionResult {
    /// Next target weight, never below zero
    pub weight: Decimal,

    /// Next tracked rep target, always within the programmed range
    pub tracked_reps: u32,

    /// Next set count (passed through unchanged by the main policy)
    pub sets: u32,

    /// Whether this adjustment is a deload
    pub deload: bool,

    /// Mode the decision was made under
    pub mode: ProgressionMode,
}

/// Where a first-week baseline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineSource {
    /// Worst completed set logged on the instance itself
    CurrentSets,
    /// Worst completed set of the chain's most recent prior session
    PriorSessionSets,
    /// Minimum of the programmed range (no logged data anywhere)
    ProgrammedMinimum,
}

/// Resolved first-week baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub reps: u32,
    pub source: BaselineSource,
}

/// Partial update written through the store. Only supplied fields change,
/// mirroring the store's partial-row write semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceUpdate {
    pub weight: Option<Decimal>,
    pub sets: Option<u32>,
    pub tracked_reps: Option<u32>,
    pub min_increment: Option<Decimal>,
    pub increment_configured: Option<bool>,
    pub completed: Option<bool>,
    pub difficulty: Option<Difficulty>,
    pub fatigue: Option<u8>,
    pub pain: Option<u8>,
}

impl InstanceUpdate {
    pub fn is_empty(&self) -> bool {
        self == &InstanceUpdate::default()
    }

    /// Apply this partial update to an in-memory instance record.
    pub fn apply(&self, instance: &mut ExerciseInstance) {
        if let Some(weight) = self.weight {
            instance.weight = Some(weight);
        }
        if let Some(sets) = self.sets {
            instance.sets = sets;
        }
        if let Some(tracked) = self.tracked_reps {
            instance.tracked_reps = Some(tracked);
        }
        if let Some(increment) = self.min_increment {
            instance.min_increment = Some(increment);
        }
        if let Some(configured) = self.increment_configured {
            instance.increment_configured = configured;
        }
        if let Some(completed) = self.completed {
            instance.completed = completed;
        }
        if let Some(difficulty) = self.difficulty {
            instance.difficulty = Some(difficulty);
        }
        if let Some(fatigue) = self.fatigue {
            instance.fatigue = Some(fatigue);
        }
        if let Some(pain) = self.pain {
            instance.pain = Some(pain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_instance() -> ExerciseInstance {
        ExerciseInstance {
            id: "inst_1".to_string(),
            name: "Bench Press".to_string(),
            muscle_group: Some("Chest".to_string()),
            original_exercise_id: Some("ex_bench".to_string()),
            custom_substitute_id: None,
            sets: 3,
            weight: Some(dec!(60)),
            programmed_reps: "8-12".to_string(),
            tracked_reps: None,
            min_increment: Some(dec!(2.5)),
            increment_configured: true,
            completed: false,
            substituted: false,
            difficulty: None,
            fatigue: None,
            pain: None,
            workout_id: "workout_1".to_string(),
            enrollment_id: "enr_1".to_string(),
            workout_created_at: Utc::now(),
        }
    }

    #[test]
    fn test_difficulty_parsing_english_and_legacy() {
        assert_eq!("very_easy".parse::<Difficulty>().unwrap(), Difficulty::VeryEasy);
        assert_eq!("muito_facil".parse::<Difficulty>().unwrap(), Difficulty::VeryEasy);
        assert_eq!("facil".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("moderado".parse::<Difficulty>().unwrap(), Difficulty::Moderate);
        assert_eq!("dificil".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("muito_dificil".parse::<Difficulty>().unwrap(), Difficulty::VeryHard);
        assert!("brutal".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_difficulty_display_round_trip() {
        for difficulty in [
            Difficulty::VeryEasy,
            Difficulty::Easy,
            Difficulty::Moderate,
            Difficulty::Hard,
            Difficulty::VeryHard,
        ] {
            let parsed: Difficulty = difficulty.to_string().parse().unwrap();
            assert_eq!(parsed, difficulty);
        }
    }

    #[test]
    fn test_chain_identity_prefers_original() {
        let mut instance = sample_instance();
        instance.custom_substitute_id = Some("sub_1".to_string());
        assert_eq!(
            ChainIdentity::of(&instance),
            ChainIdentity::Original("ex_bench".to_string())
        );

        instance.original_exercise_id = None;
        assert_eq!(
            ChainIdentity::of(&instance),
            ChainIdentity::Custom("sub_1".to_string())
        );

        instance.custom_substitute_id = None;
        assert!(ChainIdentity::of(&instance).is_none());
    }

    #[test]
    fn test_instance_update_partial_apply() {
        let mut instance = sample_instance();
        let update = InstanceUpdate {
            weight: Some(dec!(62.5)),
            tracked_reps: Some(9),
            ..Default::default()
        };
        update.apply(&mut instance);

        assert_eq!(instance.weight, Some(dec!(62.5)));
        assert_eq!(instance.tracked_reps, Some(9));
        // Untouched fields keep their values
        assert_eq!(instance.sets, 3);
        assert!(!instance.completed);
    }

    #[test]
    fn test_instance_update_empty() {
        assert!(InstanceUpdate::default().is_empty());
        let update = InstanceUpdate {
            completed: Some(true),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_instance_serialization() {
        let instance = sample_instance();
        let json = serde_json::to_string(&instance).unwrap();
        let back: ExerciseInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instance);
    }
}
