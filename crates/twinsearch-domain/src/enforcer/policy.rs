//! Policy-document based enforcement.
//!
//! A policy consists of labeled entries. Each entry names subjects and a set
//! of resources (`thing:/<pointer>`), each resource granting and/or revoking
//! permissions. For a given subject and pointer, the decision comes from the
//! most specific resource covering the pointer that mentions READ; at equal
//! specificity a revoke wins over a grant.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;
use serde_json::Value;

use super::Enforcer;
use crate::error::{DomainError, DomainResult};
use crate::pointer::JsonPointer;

/// Permission name that controls search visibility.
pub const READ_PERMISSION: &str = "READ";

const THING_RESOURCE_PREFIX: &str = "thing:";

/// Grants and revokes on one resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRule {
    pub pointer: JsonPointer,
    pub grant: BTreeSet<String>,
    pub revoke: BTreeSet<String>,
}

/// One labeled policy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    pub label: String,
    pub subjects: BTreeSet<String>,
    pub resources: Vec<ResourceRule>,
}

impl PolicyEntry {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            subjects: BTreeSet::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.insert(subject.into());
        self
    }

    /// Grants `permissions` on the thing path `pointer`.
    pub fn grant(mut self, pointer: JsonPointer, permissions: &[&str]) -> Self {
        self.rule_mut(pointer)
            .grant
            .extend(permissions.iter().map(|p| p.to_string()));
        self
    }

    /// Revokes `permissions` on the thing path `pointer`.
    pub fn revoke(mut self, pointer: JsonPointer, permissions: &[&str]) -> Self {
        self.rule_mut(pointer)
            .revoke
            .extend(permissions.iter().map(|p| p.to_string()));
        self
    }

    fn rule_mut(&mut self, pointer: JsonPointer) -> &mut ResourceRule {
        let index = match self.resources.iter().position(|r| r.pointer == pointer) {
            Some(index) => index,
            None => {
                self.resources.push(ResourceRule {
                    pointer,
                    grant: BTreeSet::new(),
                    revoke: BTreeSet::new(),
                });
                self.resources.len() - 1
            }
        };
        &mut self.resources[index]
    }
}

/// A policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub id: Option<String>,
    pub entries: Vec<PolicyEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicy {
    policy_id: Option<String>,
    #[serde(default)]
    entries: BTreeMap<String, RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    subjects: BTreeMap<String, Value>,
    #[serde(default)]
    resources: BTreeMap<String, RawResource>,
}

#[derive(Deserialize)]
struct RawResource {
    #[serde(default)]
    grant: Vec<String>,
    #[serde(default)]
    revoke: Vec<String>,
}

impl Policy {
    pub fn new(id: Option<String>) -> Self {
        Self {
            id,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: PolicyEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Parses a policy document. Resources other than `thing:` are ignored.
    pub fn from_json(value: &Value) -> DomainResult<Self> {
        let raw: RawPolicy =
            serde_json::from_value(value.clone()).map_err(|e| DomainError::InvalidPolicy {
                message: e.to_string(),
            })?;

        let mut policy = Policy::new(raw.policy_id);
        for (label, raw_entry) in raw.entries {
            let mut entry = PolicyEntry::new(label);
            entry.subjects = raw_entry.subjects.into_keys().collect();
            for (resource, rule) in raw_entry.resources {
                let Some(path) = resource.strip_prefix(THING_RESOURCE_PREFIX) else {
                    continue;
                };
                // `thing:/` names the whole thing.
                let pointer = if path == "/" {
                    Ok(JsonPointer::root())
                } else {
                    JsonPointer::parse(path)
                };
                let pointer = pointer.map_err(|_| DomainError::InvalidPolicy {
                    message: format!("invalid resource path '{resource}' in entry '{}'", entry.label),
                })?;
                entry.resources.push(ResourceRule {
                    pointer,
                    grant: rule.grant.into_iter().collect(),
                    revoke: rule.revoke.into_iter().collect(),
                });
            }
            policy.entries.push(entry);
        }
        Ok(policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Grant,
    Revoke,
}

/// Enforcer backed by a policy document.
#[derive(Debug, Clone)]
pub struct PolicyEnforcer {
    /// READ-relevant rules per subject.
    rules: BTreeMap<String, Vec<(JsonPointer, Decision)>>,
}

impl PolicyEnforcer {
    pub fn new(policy: &Policy) -> Self {
        let mut rules: BTreeMap<String, Vec<(JsonPointer, Decision)>> = BTreeMap::new();
        for entry in &policy.entries {
            for resource in &entry.resources {
                let mut decisions = Vec::with_capacity(2);
                if resource.grant.contains(READ_PERMISSION) {
                    decisions.push(Decision::Grant);
                }
                if resource.revoke.contains(READ_PERMISSION) {
                    decisions.push(Decision::Revoke);
                }
                for subject in &entry.subjects {
                    let subject_rules = rules.entry(subject.clone()).or_default();
                    for decision in &decisions {
                        subject_rules.push((resource.pointer.clone(), *decision));
                    }
                }
            }
        }
        Self { rules }
    }

    pub fn from_json(value: &Value) -> DomainResult<Self> {
        Ok(Self::new(&Policy::from_json(value)?))
    }

    fn decide(rules: &[(JsonPointer, Decision)], pointer: &JsonPointer) -> Option<Decision> {
        let mut best: HashMap<usize, Decision> = HashMap::new();
        let mut deepest = None;
        for (rule_pointer, decision) in rules {
            if !rule_pointer.is_prefix_of(pointer) {
                continue;
            }
            let depth = rule_pointer.len();
            let slot = best.entry(depth).or_insert(*decision);
            if *decision == Decision::Revoke {
                *slot = Decision::Revoke;
            }
            deepest = deepest.max(Some(depth));
        }
        deepest.and_then(|depth| best.get(&depth).copied())
    }
}

impl Enforcer for PolicyEnforcer {
    fn grantees_for(&self, pointer: &JsonPointer) -> DomainResult<BTreeSet<String>> {
        Ok(self
            .rules
            .iter()
            .filter(|(_, rules)| Self::decide(rules, pointer) == Some(Decision::Grant))
            .map(|(subject, _)| subject.clone())
            .collect())
    }
}
