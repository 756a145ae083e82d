//! twinsearch-domain: Core indexing domain logic
//!
//! This crate turns twin ("Thing") state into search index write models:
//! - JSON pointers and revision metadata
//! - Enforcers that project read grants onto JSON pointers
//! - The enforced thing mapper that flattens a twin into field/grantee tuples
//! - Write models consumed by the updater
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             twinsearch-domain                │
//! ├─────────────────────────────────────────────┤
//! │  pointer.rs     - JSON pointer paths        │
//! │  metadata.rs    - Identity + revisions      │
//! │  enforcer/      - ACL and policy grants     │
//! │  document.rs    - Flattened document shape  │
//! │  mapper.rs      - Enforced thing mapper     │
//! │  write_model.rs - Upsert / delete intents   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod document;
pub mod enforcer;
pub mod error;
pub mod mapper;
pub mod metadata;
pub mod pointer;
pub mod write_model;

#[cfg(test)]
mod mapper_proptest;

// Re-export commonly used types at the crate root
pub use document::{FlattenedField, ThingDocument};
pub use enforcer::{
    AccessControlList, AclEnforcer, AclPermissions, Enforcer, Policy, PolicyEnforcer, PolicyEntry,
};
pub use error::{DomainError, DomainResult, MappingError, MappingResult};
pub use mapper::{EnforcedThingMapper, MapperConfig};
pub use metadata::Metadata;
pub use pointer::JsonPointer;
pub use write_model::WriteModel;
