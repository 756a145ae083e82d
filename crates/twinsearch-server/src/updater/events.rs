//! Twin change events accepted by the updater.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use twinsearch_domain::{EnforcedThingMapper, Enforcer, MappingResult, WriteModel};

/// A change to one twin, as delivered by the upstream event source.
#[derive(Clone)]
pub enum ThingEvent {
    /// The twin was created or modified and is governed by a policy.
    Modified {
        thing: Value,
        enforcer: Arc<dyn Enforcer>,
        policy_revision: u64,
    },
    /// The twin was created or modified and carries its own ACL.
    ModifiedWithAcl { thing: Value },
    /// The twin was deleted.
    Deleted {
        thing_id: String,
        revision: u64,
        policy_id: Option<String>,
        policy_revision: u64,
    },
}

impl ThingEvent {
    pub fn modified(thing: Value, enforcer: Arc<dyn Enforcer>, policy_revision: u64) -> Self {
        ThingEvent::Modified {
            thing,
            enforcer,
            policy_revision,
        }
    }

    pub fn deleted(thing_id: impl Into<String>, revision: u64) -> Self {
        ThingEvent::Deleted {
            thing_id: thing_id.into(),
            revision,
            policy_id: None,
            policy_revision: 0,
        }
    }

    pub fn into_write_model(self, mapper: &EnforcedThingMapper) -> MappingResult<WriteModel> {
        match self {
            ThingEvent::Modified {
                thing,
                enforcer,
                policy_revision,
            } => mapper.to_write_model(&thing, enforcer.as_ref(), policy_revision),
            ThingEvent::ModifiedWithAcl { thing } => mapper.map_thing_with_acl(&thing),
            ThingEvent::Deleted {
                thing_id,
                revision,
                policy_id,
                policy_revision,
            } => EnforcedThingMapper::to_delete_model(thing_id, revision, policy_id, policy_revision),
        }
    }
}

impl fmt::Debug for ThingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThingEvent::Modified {
                thing,
                policy_revision,
                ..
            } => f
                .debug_struct("Modified")
                .field("thing_id", &thing.get("thingId"))
                .field("policy_revision", policy_revision)
                .finish_non_exhaustive(),
            ThingEvent::ModifiedWithAcl { thing } => f
                .debug_struct("ModifiedWithAcl")
                .field("thing_id", &thing.get("thingId"))
                .finish_non_exhaustive(),
            ThingEvent::Deleted {
                thing_id,
                revision,
                policy_id,
                policy_revision,
            } => f
                .debug_struct("Deleted")
                .field("thing_id", thing_id)
                .field("revision", revision)
                .field("policy_id", policy_id)
                .field("policy_revision", policy_revision)
                .finish(),
        }
    }
}
