//! The flattened, access-control-aware search document.
//!
//! Persisted shape:
//!
//! ```json
//! {
//!   "_id": "org.acme:sensor-1",
//!   "_revision": 7,
//!   "policyId": "org.acme:policy-1",
//!   "__policyRev": 3,
//!   "gr": ["user:alice", "user:bob"],
//!   "t": { "...": "original twin" },
//!   "s": [ { "k": "/attributes/room", "v": "kitchen", "g": ["user:alice"] } ]
//! }
//! ```
//!
//! `policyId` is omitted when the twin has none.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::Metadata;
use crate::pointer::JsonPointer;

/// One searchable leaf of a twin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedField {
    #[serde(rename = "k")]
    pub path: JsonPointer,
    #[serde(rename = "v")]
    pub value: Value,
    #[serde(rename = "g")]
    pub grantees: BTreeSet<String>,
}

/// A twin flattened for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingDocument {
    #[serde(rename = "_id")]
    pub thing_id: String,
    #[serde(rename = "_revision")]
    pub thing_revision: u64,
    #[serde(rename = "policyId", default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(rename = "__policyRev")]
    pub policy_revision: u64,
    /// Union of all field grantees.
    #[serde(rename = "gr")]
    pub global_readers: BTreeSet<String>,
    #[serde(rename = "t")]
    pub thing: Value,
    #[serde(rename = "s")]
    pub fields: Vec<FlattenedField>,
}

impl ThingDocument {
    /// Assembles a document, deriving the header from `metadata`.
    pub fn new(metadata: &Metadata, thing: Value, fields: Vec<FlattenedField>) -> Self {
        let global_readers = fields
            .iter()
            .flat_map(|field| field.grantees.iter().cloned())
            .collect();
        Self {
            thing_id: metadata.thing_id().to_string(),
            thing_revision: metadata.thing_revision(),
            policy_id: metadata.policy_id().map(str::to_string),
            policy_revision: metadata.policy_revision(),
            global_readers,
            thing,
            fields,
        }
    }

    /// Serializes into the persisted JSON shape.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Fields at exactly `path`.
    pub fn fields_at<'a, 'p>(
        &'a self,
        path: &'p JsonPointer,
    ) -> impl Iterator<Item = &'a FlattenedField> + 'p
    where
        'a: 'p,
    {
        self.fields.iter().filter(move |field| &field.path == path)
    }
}
