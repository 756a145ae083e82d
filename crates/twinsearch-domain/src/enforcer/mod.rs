//! Read-grant projection onto JSON pointers.
//!
//! An [`Enforcer`] answers one question: which subjects may read the value at
//! a given pointer? Inheritance (a grant on `/attributes` covering
//! `/attributes/location`) is resolved inside each implementation, so callers
//! never care which authorization representation is active.
//!
//! Two representations exist:
//! - [`AclEnforcer`]: a flat access control list attached to the twin, which
//!   grants or withholds read access to the whole twin per subject.
//! - [`PolicyEnforcer`]: a separate policy document with path-scoped grants
//!   and revokes.

mod acl;
mod policy;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::DomainResult;
use crate::pointer::JsonPointer;

pub use acl::{AccessControlList, AclEnforcer, AclPermissions};
pub use policy::{Policy, PolicyEnforcer, PolicyEntry, ResourceRule, READ_PERMISSION};

/// Capability that maps a JSON pointer to the subjects allowed to read it.
///
/// Implementations must be deterministic: the same pointer always yields the
/// same set for a given enforcer instance.
pub trait Enforcer: Send + Sync {
    /// Returns the subjects granted read access at `pointer`.
    fn grantees_for(&self, pointer: &JsonPointer) -> DomainResult<BTreeSet<String>>;
}

impl<E: Enforcer + ?Sized> Enforcer for &E {
    fn grantees_for(&self, pointer: &JsonPointer) -> DomainResult<BTreeSet<String>> {
        (**self).grantees_for(pointer)
    }
}

impl<E: Enforcer + ?Sized> Enforcer for Arc<E> {
    fn grantees_for(&self, pointer: &JsonPointer) -> DomainResult<BTreeSet<String>> {
        (**self).grantees_for(pointer)
    }
}

impl<E: Enforcer + ?Sized> Enforcer for Box<E> {
    fn grantees_for(&self, pointer: &JsonPointer) -> DomainResult<BTreeSet<String>> {
        (**self).grantees_for(pointer)
    }
}
