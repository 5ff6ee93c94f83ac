//! Completion workflow and increment propagation
//!
//! On each completed exercise the orchestrator records the feedback, decides
//! first-week versus steady-state, runs the policy, and writes the computed
//! target onto the chain's next pending instance — so the future session is
//! already pre-populated when the user opens it. Every invocation reads and
//! writes through the injected store; the orchestrator keeps no state.
//!
//! Precomputation failures never block the completion that triggered them:
//! once the completion write lands, any later failure is logged and folded
//! into the returned outcome, and the next session re-baselines from its
//! own logged sets.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::baseline::BaselineResolver;
use crate::error::Result;
use crate::models::{
    ChainIdentity, Difficulty, ExerciseInstance, InstanceUpdate, ProgressionResult,
    ProgressionSnapshot,
};
use crate::locator::NextInstanceLocator;
use crate::policy::{PolicyDefaults, ProgressionPolicy};
use crate::reps::{progression_mode, RepsRange};
use crate::store::InstanceStore;

/// What a completion workflow did. The silent no-op paths are explicit
/// variants so callers and tests can assert on them without reading logs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressionOutcome {
    /// Target written onto the next instance
    Precomputed {
        next_instance_id: String,
        result: ProgressionResult,
    },
    /// Substituted instance: only the set count was adjusted
    SeriesAdjusted {
        next_instance_id: String,
        sets: u32,
    },
    /// Neither original nor substitute identity present; nothing to chain
    NoChainIdentity,
    /// No pending occurrence of the chain remains in the enrollment
    NoNextInstance,
    /// The completion was recorded but the precomputation failed. The next
    /// session re-baselines from its own sets instead.
    PrecomputeFailed { reason: String },
}

/// Ties the range model, baseline resolver, policy and locator together over
/// an injected store.
pub struct ProgressionOrchestrator<'a> {
    store: &'a dyn InstanceStore,
    defaults: PolicyDefaults,
}

impl<'a> ProgressionOrchestrator<'a> {
    pub fn new(store: &'a dyn InstanceStore) -> Self {
        Self::with_defaults(store, PolicyDefaults::default())
    }

    /// Orchestrator with config-resolved fallbacks instead of the shipped
    /// constants.
    pub fn with_defaults(store: &'a dyn InstanceStore, defaults: PolicyDefaults) -> Self {
        Self { store, defaults }
    }

    /// Record feedback for a just-finished instance and precompute the next
    /// occurrence's target.
    ///
    /// The completion and feedback are written first, and only a failure of
    /// those writes is an `Err`. Anything that goes wrong after that point
    /// is confined to the precomputation and reported as
    /// [`ProgressionOutcome::PrecomputeFailed`], so the caller can announce
    /// the recorded session truthfully either way.
    pub fn on_exercise_completed(
        &self,
        instance_id: &str,
        difficulty: Difficulty,
        fatigue: u8,
        pain: Option<u8>,
    ) -> Result<ProgressionOutcome> {
        let instance = self.store.get_instance(instance_id)?;

        self.store.update_instance(
            instance_id,
            &InstanceUpdate {
                completed: Some(true),
                difficulty: Some(difficulty),
                fatigue: Some(fatigue),
                pain,
                ..Default::default()
            },
        )?;

        match self.precompute_next(&instance, difficulty, fatigue, pain) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(instance_id, error = %err, "Precomputation failed after completion");
                Ok(ProgressionOutcome::PrecomputeFailed {
                    reason: err.user_message(),
                })
            }
        }
    }

    fn precompute_next(
        &self,
        instance: &ExerciseInstance,
        difficulty: Difficulty,
        fatigue: u8,
        pain: Option<u8>,
    ) -> Result<ProgressionOutcome> {
        let instance_id = instance.id.as_str();
        let identity = ChainIdentity::of(instance);
        if identity.is_none() {
            info!(instance_id, "No chain identity, skipping precomputation");
            return Ok(ProgressionOutcome::NoChainIdentity);
        }

        let next = NextInstanceLocator::find_next(
            self.store,
            &identity,
            &instance.enrollment_id,
            instance_id,
        )?;
        let Some(next) = next else {
            info!(instance_id, chain = ?identity, "No next instance, nothing to precompute");
            return Ok(ProgressionOutcome::NoNextInstance);
        };

        if instance.substituted {
            return self.adjust_substituted(instance, &next, fatigue);
        }

        // A missing tracked target always takes the baseline path, whether
        // this is the chain's genuine first appearance or a repeat session
        // left unset by an earlier failed precompute. Running the tables on
        // a guessed target would advance weight off bad data.
        let result = match instance.tracked_reps {
            None => {
                let first = NextInstanceLocator::is_first_occurrence(
                    self.store,
                    &identity,
                    &instance.enrollment_id,
                    instance_id,
                )?;
                if !first {
                    info!(instance_id, "Repeat occurrence with no tracked target, re-baselining");
                }
                self.first_week_target(instance)?
            }
            Some(tracked) => {
                self.steady_state_target(instance, &identity, tracked, difficulty, fatigue, pain)?
            }
        };

        self.store.update_instance(
            &next.id,
            &InstanceUpdate {
                weight: Some(result.weight),
                sets: Some(result.sets),
                tracked_reps: Some(result.tracked_reps),
                ..Default::default()
            },
        )?;

        info!(
            instance_id,
            next_id = %next.id,
            weight = %result.weight,
            reps = result.tracked_reps,
            sets = result.sets,
            deload = result.deload,
            mode = %result.mode,
            "Precomputed next session target"
        );

        Ok(ProgressionOutcome::Precomputed {
            next_instance_id: next.id,
            result,
        })
    }

    /// No tracked target yet: no decision table. The baseline from the
    /// worst logged set becomes the next target; weight and sets carry over
    /// unchanged.
    fn first_week_target(&self, instance: &ExerciseInstance) -> Result<ProgressionResult> {
        let baseline =
            BaselineResolver::resolve_baseline(self.store, instance, self.defaults.fallback_range)?;
        Ok(ProgressionResult {
            weight: instance.weight.unwrap_or(Decimal::ZERO),
            tracked_reps: baseline.reps,
            sets: instance.sets,
            deload: false,
            mode: progression_mode(&instance.programmed_reps),
        })
    }

    /// Steady state: assemble the snapshot from the current instance and run
    /// the decision tables.
    fn steady_state_target(
        &self,
        instance: &ExerciseInstance,
        identity: &ChainIdentity,
        tracked: u32,
        difficulty: Difficulty,
        fatigue: u8,
        pain: Option<u8>,
    ) -> Result<ProgressionResult> {
        let range = RepsRange::parse_or(&instance.programmed_reps, self.defaults.fallback_range);

        let sets = self.store.list_sets(&instance.id)?;
        let executed = match BaselineResolver::worst_set_reps(&sets) {
            Some(reps) => reps,
            None => {
                // No logged sets against a completed instance: the tracked
                // target stands in for the executed count, so the rating
                // alone decides the adjustment.
                warn!(instance_id = %instance.id, "Completed instance has no logged sets");
                tracked
            }
        };

        let increment = self.resolve_increment(instance, identity)?;

        let snapshot = ProgressionSnapshot {
            weight: instance.weight.unwrap_or(Decimal::ZERO),
            range,
            mode: progression_mode(&instance.programmed_reps),
            tracked_reps: tracked,
            executed_reps: executed,
            sets: instance.sets,
            increment,
            difficulty,
            fatigue: Some(fatigue),
            pain,
        };

        Ok(ProgressionPolicy::compute_progression(&snapshot))
    }

    /// Increment resolution order: explicit per-instance value, else a value
    /// inherited from any other instance of the chain in the enrollment,
    /// else the fixed default.
    fn resolve_increment(
        &self,
        instance: &ExerciseInstance,
        identity: &ChainIdentity,
    ) -> Result<Decimal> {
        if let Some(increment) = instance.min_increment {
            return Ok(increment);
        }
        let inherited =
            self.store
                .chain_increment(identity, &instance.enrollment_id, &instance.id)?;
        Ok(inherited.unwrap_or(self.defaults.increment))
    }

    /// Substituted instances freeze weight and reps; only the set count
    /// moves, by the fatigue-threshold rule.
    fn adjust_substituted(
        &self,
        instance: &ExerciseInstance,
        next: &ExerciseInstance,
        fatigue: u8,
    ) -> Result<ProgressionOutcome> {
        let sets = ProgressionPolicy::adjust_substituted_sets(instance.sets, fatigue, &self.defaults);
        self.store.update_instance(
            &next.id,
            &InstanceUpdate {
                sets: Some(sets),
                ..Default::default()
            },
        )?;
        info!(
            instance_id = %instance.id,
            next_id = %next.id,
            sets,
            "Substituted instance: series-only adjustment"
        );
        Ok(ProgressionOutcome::SeriesAdjusted {
            next_instance_id: next.id.clone(),
            sets,
        })
    }
}

/// Spreads a user-configured equipment increment across a chain's future
/// instances.
pub struct IncrementPropagator;

impl IncrementPropagator {
    /// Set `min_increment` on every not-yet-completed instance of the chain
    /// within the enrollment. Completed instances are history and stay
    /// untouched. Returns the number of instances written. Idempotent.
    pub fn propagate_increment(
        store: &dyn InstanceStore,
        identity: &ChainIdentity,
        enrollment_id: &str,
        value: Decimal,
    ) -> Result<usize> {
        if identity.is_none() {
            return Ok(0);
        }

        let pending = store.pending_instances(identity, enrollment_id)?;
        let update = InstanceUpdate {
            min_increment: Some(value),
            increment_configured: Some(true),
            ..Default::default()
        };
        for instance in &pending {
            store.update_instance(&instance.id, &update)?;
        }

        info!(
            chain = ?identity,
            enrollment_id,
            %value,
            count = pending.len(),
            "Propagated minimum increment"
        );
        Ok(pending.len())
    }
}
