//! Enforced thing mapper.
//!
//! Flattens a twin's JSON state into `(pointer, value, grantees)` tuples and
//! wraps the result into a [`WriteModel`].
//!
//! # Flattening rules
//!
//! - Objects are walked depth-first in key order, so the output is
//!   deterministic for a given twin and enforcer.
//! - Scalars (`null`, booleans, numbers, strings) are leaves.
//! - Arrays are not indexed by position: every element is flattened under the
//!   array's own pointer, so `/attributes/tags = "x"` matches any element.
//! - Empty objects and arrays produce no fields.
//! - Top-level fields starting with `_` are system fields and are skipped.
//!
//! Grantee inheritance is delegated to the [`Enforcer`]; the mapper only asks
//! for the grantees of each leaf pointer.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{FlattenedField, ThingDocument};
use crate::enforcer::{AclEnforcer, Enforcer};
use crate::error::{MappingError, MappingResult};
use crate::metadata::Metadata;
use crate::pointer::JsonPointer;
use crate::write_model::WriteModel;

/// Field carrying the twin identifier.
pub const THING_ID_FIELD: &str = "thingId";
/// Field carrying the twin revision.
pub const REVISION_FIELD: &str = "_revision";
/// Field carrying the policy identifier.
pub const POLICY_ID_FIELD: &str = "policyId";

/// Configuration for the mapper.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Maximum object/array nesting below the twin root.
    pub max_depth: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

impl MapperConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Converts twins into write models.
#[derive(Debug, Clone, Default)]
pub struct EnforcedThingMapper {
    config: MapperConfig,
}

impl EnforcedThingMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    /// Maps a twin into an upsert.
    ///
    /// Fails without producing anything when the twin is malformed or the
    /// enforcer cannot resolve a pointer.
    pub fn to_write_model<E>(
        &self,
        thing: &Value,
        enforcer: &E,
        policy_revision: u64,
    ) -> MappingResult<WriteModel>
    where
        E: Enforcer + ?Sized,
    {
        let object = thing.as_object().ok_or(MappingError::NotAnObject)?;
        let metadata = extract_metadata(object, policy_revision)?;
        let fields = self.flatten(object, enforcer)?;

        debug!(
            thing_id = %metadata.thing_id(),
            revision = metadata.thing_revision(),
            fields = fields.len(),
            "mapped twin"
        );

        let document = ThingDocument::new(&metadata, thing.clone(), fields);
        Ok(WriteModel::Upsert { document, metadata })
    }

    /// Parses `thing_json` and maps it into an upsert.
    pub fn to_write_model_from_str<E>(
        &self,
        thing_json: &str,
        enforcer: &E,
        policy_revision: u64,
    ) -> MappingResult<WriteModel>
    where
        E: Enforcer + ?Sized,
    {
        let thing: Value =
            serde_json::from_str(thing_json).map_err(|e| MappingError::InvalidJson {
                message: e.to_string(),
            })?;
        self.to_write_model(&thing, enforcer, policy_revision)
    }

    /// Maps a twin that carries its own ACL.
    ///
    /// The enforcer is built from the twin's `acl` field and the twin's own
    /// revision doubles as the policy revision (0 when absent).
    pub fn map_thing_with_acl(&self, thing: &Value) -> MappingResult<WriteModel> {
        let enforcer = AclEnforcer::from_thing(thing)?;
        let policy_revision = thing
            .get(REVISION_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        self.to_write_model(thing, &enforcer, policy_revision)
    }

    /// Builds a delete carrying only metadata.
    pub fn to_delete_model(
        thing_id: impl Into<String>,
        thing_revision: u64,
        policy_id: Option<String>,
        policy_revision: u64,
    ) -> MappingResult<WriteModel> {
        let metadata = Metadata::new(thing_id, thing_revision, policy_id, policy_revision)?;
        Ok(WriteModel::Delete { metadata })
    }

    /// Flattens the twin body into searchable fields.
    pub fn flatten<E>(&self, thing: &Map<String, Value>, enforcer: &E) -> MappingResult<Vec<FlattenedField>>
    where
        E: Enforcer + ?Sized,
    {
        let mut walker = Walker {
            enforcer,
            max_depth: self.config.max_depth,
            grantee_cache: HashMap::new(),
            fields: Vec::new(),
        };
        for (key, value) in thing {
            if key.starts_with('_') {
                continue;
            }
            walker.visit(JsonPointer::root().child(key.as_str()), value, 1)?;
        }
        Ok(walker.fields)
    }
}

fn extract_metadata(thing: &Map<String, Value>, policy_revision: u64) -> MappingResult<Metadata> {
    let thing_id = match thing.get(THING_ID_FIELD) {
        None | Some(Value::Null) => {
            return Err(MappingError::MissingField {
                field: THING_ID_FIELD.to_string(),
            })
        }
        Some(Value::String(id)) => id.clone(),
        Some(_) => {
            return Err(MappingError::InvalidField {
                field: THING_ID_FIELD.to_string(),
                message: "must be a string".to_string(),
            })
        }
    };

    let revision = match thing.get(REVISION_FIELD) {
        None | Some(Value::Null) => {
            return Err(MappingError::MissingField {
                field: REVISION_FIELD.to_string(),
            })
        }
        Some(value) => value.as_u64().ok_or_else(|| MappingError::InvalidField {
            field: REVISION_FIELD.to_string(),
            message: "must be a non-negative integer".to_string(),
        })?,
    };

    let policy_id = match thing.get(POLICY_ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => {
            return Err(MappingError::InvalidField {
                field: POLICY_ID_FIELD.to_string(),
                message: "must be a string".to_string(),
            })
        }
    };

    Ok(Metadata::new(thing_id, revision, policy_id, policy_revision)?)
}

struct Walker<'e, E: Enforcer + ?Sized> {
    enforcer: &'e E,
    max_depth: usize,
    grantee_cache: HashMap<JsonPointer, BTreeSet<String>>,
    fields: Vec<FlattenedField>,
}

impl<E: Enforcer + ?Sized> Walker<'_, E> {
    fn visit(&mut self, pointer: JsonPointer, value: &Value, depth: usize) -> MappingResult<()> {
        if depth > self.max_depth {
            return Err(MappingError::DepthLimitExceeded {
                max_depth: self.max_depth,
                pointer: pointer.to_string(),
            });
        }
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.visit(pointer.child(key.as_str()), child, depth + 1)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(pointer.clone(), item, depth + 1)?;
                }
            }
            scalar => {
                let grantees = self.grantees(&pointer)?;
                self.fields.push(FlattenedField {
                    path: pointer,
                    value: scalar.clone(),
                    grantees,
                });
            }
        }
        Ok(())
    }

    fn grantees(&mut self, pointer: &JsonPointer) -> MappingResult<BTreeSet<String>> {
        if let Some(cached) = self.grantee_cache.get(pointer) {
            return Ok(cached.clone());
        }
        let grantees = self.enforcer.grantees_for(pointer)?;
        self.grantee_cache.insert(pointer.clone(), grantees.clone());
        Ok(grantees)
    }
}
