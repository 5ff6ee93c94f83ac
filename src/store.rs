//! Store abstraction for exercise-instance records
//!
//! The engine holds no persistent state of its own: every workflow reads and
//! writes through an injected [`InstanceStore`]. Each call is one sequential
//! read or write; atomicity of individual writes is the store's concern, and
//! there is no optimistic concurrency control — concurrent completions of the
//! same chain can race, which is an accepted limitation of the design.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::models::{ChainIdentity, ExerciseInstance, ExerciseSet, InstanceUpdate};

fn chain_matches(identity: &ChainIdentity, instance: &ExerciseInstance) -> bool {
    match identity {
        ChainIdentity::Original(id) => instance.original_exercise_id.as_deref() == Some(id),
        ChainIdentity::Custom(id) => instance.custom_substitute_id.as_deref() == Some(id),
        ChainIdentity::None => false,
    }
}

/// External capabilities the progression engine depends on.
pub trait InstanceStore {
    /// Read one instance record.
    fn get_instance(&self, id: &str) -> Result<ExerciseInstance, StoreError>;

    /// Partial update: only supplied fields change.
    fn update_instance(&self, id: &str, update: &InstanceUpdate) -> Result<(), StoreError>;

    /// All logged sets for an instance, ordered by set number ascending.
    fn list_sets(&self, instance_id: &str) -> Result<Vec<ExerciseSet>, StoreError>;

    /// Not-yet-completed instances of a chain within an enrollment, ordered
    /// by owning-workout creation time, then instance id.
    fn pending_instances(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
    ) -> Result<Vec<ExerciseInstance>, StoreError>;

    /// Whether any other completed instance of the chain exists in the
    /// enrollment (the first-week check).
    fn has_completed_instance(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<bool, StoreError>;

    /// Logged sets of the chain's most recent completed session, excluding
    /// the given instance. Empty when the chain has no prior session.
    fn last_completed_sets(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Vec<ExerciseSet>, StoreError>;

    /// Minimum increment inherited from any other instance of the chain in
    /// the enrollment, earliest occurrence first.
    fn chain_increment(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Option<Decimal>, StoreError>;
}

/// HashMap-backed store. Used by tests and benches, and as the materialized
/// form of an imported program before it is written to the database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    instances: HashMap<String, ExerciseInstance>,
    sets: HashMap<String, Vec<ExerciseSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_instance(&self, instance: ExerciseInstance) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        state.instances.insert(instance.id.clone(), instance);
    }

    pub fn insert_set(&self, set: ExerciseSet) {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let sets = state.sets.entry(set.instance_id.clone()).or_default();
        sets.push(set);
        sets.sort_by_key(|s| s.set_number);
    }

    pub fn instance_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").instances.len()
    }

    pub fn all_instances(&self) -> Vec<ExerciseInstance> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let mut instances: Vec<_> = state.instances.values().cloned().collect();
        instances.sort_by(|a, b| {
            a.workout_created_at
                .cmp(&b.workout_created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        instances
    }

    fn completed_by_recency(
        state: &MemoryState,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Vec<ExerciseInstance> {
        let mut completed: Vec<_> = state
            .instances
            .values()
            .filter(|i| {
                i.completed
                    && i.id != exclude_id
                    && i.enrollment_id == enrollment_id
                    && chain_matches(identity, i)
            })
            .cloned()
            .collect();
        // Most recent session first
        completed.sort_by(|a, b| {
            b.workout_created_at
                .cmp(&a.workout_created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        completed
    }
}

impl InstanceStore for MemoryStore {
    fn get_instance(&self, id: &str) -> Result<ExerciseInstance, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        state
            .instances
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "exercise_instance".to_string(),
                id: id.to_string(),
            })
    }

    fn update_instance(&self, id: &str, update: &InstanceUpdate) -> Result<(), StoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let instance = state
            .instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "exercise_instance".to_string(),
                id: id.to_string(),
            })?;
        update.apply(instance);
        Ok(())
    }

    fn list_sets(&self, instance_id: &str) -> Result<Vec<ExerciseSet>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.sets.get(instance_id).cloned().unwrap_or_default())
    }

    fn pending_instances(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
    ) -> Result<Vec<ExerciseInstance>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let mut pending: Vec<_> = state
            .instances
            .values()
            .filter(|i| {
                !i.completed && i.enrollment_id == enrollment_id && chain_matches(identity, i)
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.workout_created_at
                .cmp(&b.workout_created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pending)
    }

    fn has_completed_instance(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<bool, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.instances.values().any(|i| {
            i.completed
                && i.id != exclude_id
                && i.enrollment_id == enrollment_id
                && chain_matches(identity, i)
        }))
    }

    fn last_completed_sets(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Vec<ExerciseSet>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let completed = Self::completed_by_recency(&state, identity, enrollment_id, exclude_id);
        for instance in completed {
            if let Some(sets) = state.sets.get(&instance.id) {
                if !sets.is_empty() {
                    return Ok(sets.clone());
                }
            }
        }
        Ok(Vec::new())
    }

    fn chain_increment(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Option<Decimal>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let mut candidates: Vec<_> = state
            .instances
            .values()
            .filter(|i| {
                i.id != exclude_id
                    && i.enrollment_id == enrollment_id
                    && i.min_increment.is_some()
                    && chain_matches(identity, i)
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.workout_created_at
                .cmp(&b.workout_created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(candidates.first().and_then(|i| i.min_increment))
    }
}

/// Test/bench helper: build an instance with the common fields filled in.
pub fn build_instance(
    id: &str,
    chain: &ChainIdentity,
    enrollment_id: &str,
    workout_id: &str,
    workout_created_at: DateTime<Utc>,
) -> ExerciseInstance {
    let (original, custom) = match chain {
        ChainIdentity::Original(x) => (Some(x.clone()), None),
        ChainIdentity::Custom(x) => (None, Some(x.clone())),
        ChainIdentity::None => (None, None),
    };
    ExerciseInstance {
        id: id.to_string(),
        name: "Exercise".to_string(),
        muscle_group: None,
        original_exercise_id: original,
        custom_substitute_id: custom,
        sets: 3,
        weight: None,
        programmed_reps: "8-12".to_string(),
        tracked_reps: None,
        min_increment: None,
        increment_configured: false,
        completed: false,
        substituted: false,
        difficulty: None,
        fatigue: None,
        pain: None,
        workout_id: workout_id.to_string(),
        enrollment_id: enrollment_id.to_string(),
        workout_created_at,
    }
}
