//! First-week baseline establishment
//!
//! The first time an exercise chain is completed there is no tracked rep
//! target yet. The baseline is taken from the worst completed set: the
//! weakest performance is the safe, repeatable target, not the best one.

use tracing::debug;

use crate::error::Result;
use crate::models::{Baseline, BaselineSource, ChainIdentity, ExerciseInstance, ExerciseSet, InstanceUpdate};
use crate::reps::RepsRange;
use crate::store::InstanceStore;

/// Resolves and persists the tracked rep target for a chain's first
/// completed appearance.
pub struct BaselineResolver;

impl BaselineResolver {
    /// Derive the baseline rep count for `instance` and persist it as the
    /// instance's tracked target.
    ///
    /// Fallback chain: worst completed set logged on the instance itself,
    /// else the worst set of the chain's most recent prior session (used
    /// when computing progression for a future instance before its own sets
    /// exist), else the minimum of the programmed range.
    pub fn resolve_baseline(
        store: &dyn InstanceStore,
        instance: &ExerciseInstance,
        fallback_range: RepsRange,
    ) -> Result<Baseline> {
        let baseline = Self::derive(store, instance, fallback_range)?;

        store.update_instance(
            &instance.id,
            &InstanceUpdate {
                tracked_reps: Some(baseline.reps),
                ..Default::default()
            },
        )?;

        debug!(
            instance_id = %instance.id,
            reps = baseline.reps,
            source = ?baseline.source,
            "Baseline established"
        );
        Ok(baseline)
    }

    fn derive(
        store: &dyn InstanceStore,
        instance: &ExerciseInstance,
        fallback_range: RepsRange,
    ) -> Result<Baseline> {
        let own_sets = store.list_sets(&instance.id)?;
        if let Some(reps) = Self::worst_set_reps(&own_sets) {
            return Ok(Baseline {
                reps,
                source: BaselineSource::CurrentSets,
            });
        }

        let identity = ChainIdentity::of(instance);
        if !identity.is_none() {
            let prior_sets =
                store.last_completed_sets(&identity, &instance.enrollment_id, &instance.id)?;
            if let Some(reps) = Self::worst_set_reps(&prior_sets) {
                return Ok(Baseline {
                    reps,
                    source: BaselineSource::PriorSessionSets,
                });
            }
        }

        let range = RepsRange::parse_or(&instance.programmed_reps, fallback_range);
        Ok(Baseline {
            reps: range.min,
            source: BaselineSource::ProgrammedMinimum,
        })
    }

    /// Minimum reps among completed sets. Sets arrive ordered by set number,
    /// and the strict comparison keeps the first set on ties, so the result
    /// is deterministic.
    pub fn worst_set_reps(sets: &[ExerciseSet]) -> Option<u32> {
        let mut worst: Option<u32> = None;
        for set in sets.iter().filter(|s| s.completed) {
            match worst {
                Some(current) if set.reps >= current => {}
                _ => worst = Some(set.reps),
            }
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reps::DEFAULT_RANGE;
    use crate::store::{build_instance, MemoryStore};
    use chrono::{Duration, Utc};

    fn chain() -> ChainIdentity {
        ChainIdentity::Original("ex_row".to_string())
    }

    fn set(instance_id: &str, number: u32, reps: u32, completed: bool) -> ExerciseSet {
        ExerciseSet {
            id: format!("{}_{}", instance_id, number),
            instance_id: instance_id.to_string(),
            set_number: number,
            weight: None,
            reps,
            completed,
        }
    }

    #[test]
    fn test_baseline_from_worst_current_set() {
        let store = MemoryStore::new();
        store.insert_instance(build_instance("i1", &chain(), "enr", "w1", Utc::now()));
        for (n, reps) in [(1u32, 10u32), (2, 8), (3, 9)] {
            store.insert_set(set("i1", n, reps, true));
        }

        let instance = store.get_instance("i1").unwrap();
        let baseline = BaselineResolver::resolve_baseline(&store, &instance, DEFAULT_RANGE).unwrap();
        assert_eq!(baseline.reps, 8);
        assert_eq!(baseline.source, BaselineSource::CurrentSets);

        // Side effect: tracked target written back to the instance
        assert_eq!(store.get_instance("i1").unwrap().tracked_reps, Some(8));
    }

    #[test]
    fn test_baseline_ignores_incomplete_sets() {
        let store = MemoryStore::new();
        store.insert_instance(build_instance("i1", &chain(), "enr", "w1", Utc::now()));
        store.insert_set(set("i1", 1, 3, false));
        store.insert_set(set("i1", 2, 10, true));

        let instance = store.get_instance("i1").unwrap();
        let baseline = BaselineResolver::resolve_baseline(&store, &instance, DEFAULT_RANGE).unwrap();
        assert_eq!(baseline.reps, 10);
    }

    #[test]
    fn test_baseline_falls_back_to_prior_session() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let mut prior = build_instance("prior", &chain(), "enr", "w1", t0);
        prior.completed = true;
        store.insert_instance(prior);
        store.insert_set(set("prior", 1, 9, true));
        store.insert_set(set("prior", 2, 7, true));

        store.insert_instance(build_instance("next", &chain(), "enr", "w2", t0 + Duration::days(7)));

        let instance = store.get_instance("next").unwrap();
        let baseline = BaselineResolver::resolve_baseline(&store, &instance, DEFAULT_RANGE).unwrap();
        assert_eq!(baseline.reps, 7);
        assert_eq!(baseline.source, BaselineSource::PriorSessionSets);
        assert_eq!(store.get_instance("next").unwrap().tracked_reps, Some(7));
    }

    #[test]
    fn test_baseline_falls_back_to_programmed_minimum() {
        let store = MemoryStore::new();
        store.insert_instance(build_instance("i1", &chain(), "enr", "w1", Utc::now()));

        let instance = store.get_instance("i1").unwrap();
        let baseline = BaselineResolver::resolve_baseline(&store, &instance, DEFAULT_RANGE).unwrap();
        assert_eq!(baseline.reps, 8); // programmed "8-12"
        assert_eq!(baseline.source, BaselineSource::ProgrammedMinimum);
    }

    #[test]
    fn test_worst_set_tie_keeps_first_by_set_number() {
        let sets = vec![
            set("i", 1, 8, true),
            set("i", 2, 8, true),
            set("i", 3, 10, true),
        ];
        // Both set 1 and set 2 hit the minimum; the scan keeps set 1's value.
        // Identical inputs always give identical output.
        assert_eq!(BaselineResolver::worst_set_reps(&sets), Some(8));
        assert_eq!(BaselineResolver::worst_set_reps(&sets), Some(8));
    }

    #[test]
    fn test_worst_set_empty_is_none() {
        assert_eq!(BaselineResolver::worst_set_reps(&[]), None);
        let incomplete = vec![set("i", 1, 5, false)];
        assert_eq!(BaselineResolver::worst_set_reps(&incomplete), None);
    }
}
