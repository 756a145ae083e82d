//! Access-control-list based enforcement.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::Enforcer;
use crate::error::{DomainError, DomainResult};
use crate::pointer::JsonPointer;

/// Permissions a subject holds under an ACL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AclPermissions {
    pub read: bool,
    pub write: bool,
    pub administrate: bool,
}

impl AclPermissions {
    /// Read-only permissions.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Read, write and administrate.
    pub fn all() -> Self {
        Self {
            read: true,
            write: true,
            administrate: true,
        }
    }
}

/// A flat access control list keyed by subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlList {
    entries: BTreeMap<String, AclPermissions>,
}

impl AccessControlList {
    /// Creates an empty ACL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `subject`.
    pub fn with_entry(mut self, subject: impl Into<String>, permissions: AclPermissions) -> Self {
        self.entries.insert(subject.into(), permissions);
        self
    }

    /// Parses the `acl` field of a twin.
    ///
    /// Expected shape: `{"<subject>": {"READ": bool, "WRITE": bool, "ADMINISTRATE": bool}}`.
    /// Missing permissions default to `false`; unknown permission names are
    /// rejected.
    pub fn from_json(value: &Value) -> DomainResult<Self> {
        let object = value.as_object().ok_or_else(|| DomainError::InvalidAcl {
            message: "acl must be a json object".to_string(),
        })?;

        let mut acl = Self::new();
        for (subject, permissions) in object {
            if subject.is_empty() {
                return Err(DomainError::InvalidAcl {
                    message: "acl subject cannot be empty".to_string(),
                });
            }
            let permissions = permissions
                .as_object()
                .ok_or_else(|| DomainError::InvalidAcl {
                    message: format!("permissions of '{subject}' must be a json object"),
                })?;

            let mut parsed = AclPermissions::default();
            for (name, flag) in permissions {
                let flag = flag.as_bool().ok_or_else(|| DomainError::InvalidAcl {
                    message: format!("permission '{name}' of '{subject}' must be a boolean"),
                })?;
                match name.as_str() {
                    "READ" => parsed.read = flag,
                    "WRITE" => parsed.write = flag,
                    "ADMINISTRATE" => parsed.administrate = flag,
                    other => {
                        return Err(DomainError::InvalidAcl {
                            message: format!("unknown permission '{other}' for '{subject}'"),
                        })
                    }
                }
            }
            acl.entries.insert(subject.clone(), parsed);
        }
        Ok(acl)
    }

    /// Subjects holding READ.
    pub fn readers(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|(_, permissions)| permissions.read)
            .map(|(subject, _)| subject.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Enforcer backed by an ACL.
///
/// ACL grants are not path scoped, so every pointer has the same grantees.
#[derive(Debug, Clone)]
pub struct AclEnforcer {
    readers: BTreeSet<String>,
}

impl AclEnforcer {
    pub fn new(acl: &AccessControlList) -> Self {
        Self {
            readers: acl.readers(),
        }
    }

    /// Builds the enforcer from a twin's own `acl` field; no field means an
    /// empty ACL.
    pub fn from_thing(thing: &Value) -> DomainResult<Self> {
        match thing.get("acl") {
            Some(acl) => Ok(Self::new(&AccessControlList::from_json(acl)?)),
            None => Ok(Self::new(&AccessControlList::new())),
        }
    }
}

impl Enforcer for AclEnforcer {
    fn grantees_for(&self, _pointer: &JsonPointer) -> DomainResult<BTreeSet<String>> {
        Ok(self.readers.clone())
    }
}
