//! Identity and revision key of one index entry.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{DomainError, DomainResult};

/// Identity plus versioning of a twin's index entry.
///
/// Two values are comparable only when their `thing_id`s match. Ordering is
/// lexicographic on `(thing_revision, policy_revision)`: a policy revision
/// only breaks ties between equal thing revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    thing_id: String,
    thing_revision: u64,
    policy_id: Option<String>,
    policy_revision: u64,
}

impl Metadata {
    /// Creates metadata, rejecting an empty thing id.
    pub fn new(
        thing_id: impl Into<String>,
        thing_revision: u64,
        policy_id: Option<String>,
        policy_revision: u64,
    ) -> DomainResult<Self> {
        let thing_id = thing_id.into();
        if thing_id.trim().is_empty() {
            return Err(DomainError::InvalidMetadata {
                message: "thing id cannot be empty".to_string(),
            });
        }
        Ok(Self {
            thing_id,
            thing_revision,
            policy_id,
            policy_revision,
        })
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    pub fn thing_revision(&self) -> u64 {
        self.thing_revision
    }

    pub fn policy_id(&self) -> Option<&str> {
        self.policy_id.as_deref()
    }

    pub fn policy_revision(&self) -> u64 {
        self.policy_revision
    }

    /// The revision pair used for staleness decisions.
    pub fn revision_key(&self) -> (u64, u64) {
        (self.thing_revision, self.policy_revision)
    }

    /// True when both describe the same twin.
    pub fn is_comparable(&self, other: &Metadata) -> bool {
        self.thing_id == other.thing_id
    }

    /// Orders two metadata of the same twin; `None` for different twins.
    pub fn compare_revisions(&self, other: &Metadata) -> Option<Ordering> {
        self.is_comparable(other)
            .then(|| self.revision_key().cmp(&other.revision_key()))
    }
}
