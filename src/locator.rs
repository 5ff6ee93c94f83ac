//! Next-occurrence lookup within a program enrollment
//!
//! Future occurrences of an exercise are ordered by the creation time of
//! their owning workout; instance id is the secondary sort key so ties on
//! equal timestamps resolve deterministically.

use tracing::debug;

use crate::error::Result;
use crate::models::{ChainIdentity, ExerciseInstance};
use crate::store::InstanceStore;

pub struct NextInstanceLocator;

impl NextInstanceLocator {
    /// The chronologically next not-yet-completed instance of the chain in
    /// the enrollment, excluding the instance just completed. `None` when
    /// the chain has no identity or no future occurrence remains.
    pub fn find_next(
        store: &dyn InstanceStore,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Option<ExerciseInstance>> {
        if identity.is_none() {
            return Ok(None);
        }

        let pending = store.pending_instances(identity, enrollment_id)?;
        let next = pending.into_iter().find(|i| i.id != exclude_id);

        match &next {
            Some(instance) => debug!(
                chain = ?identity,
                next_id = %instance.id,
                workout_id = %instance.workout_id,
                "Located next instance"
            ),
            None => debug!(chain = ?identity, "No pending instance remains"),
        }
        Ok(next)
    }

    /// True iff no other completed instance of the chain exists in the
    /// enrollment — the just-finished instance is the chain's first tracked
    /// appearance.
    pub fn is_first_occurrence(
        store: &dyn InstanceStore,
        identity: &ChainIdentity,
        enrollment_id: &str,
        current_id: &str,
    ) -> Result<bool> {
        if identity.is_none() {
            return Ok(true);
        }
        let seen = store.has_completed_instance(identity, enrollment_id, current_id)?;
        Ok(!seen)
    }
}
