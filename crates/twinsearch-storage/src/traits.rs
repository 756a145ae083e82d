//! DocumentStore trait definition.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StorageError, StorageResult};

/// Maximum accepted length of a document id.
pub const MAX_DOCUMENT_ID_LENGTH: usize = 256;

/// Revision of an indexed document.
///
/// Ordering is lexicographic: `thing_revision` first, `policy_revision`
/// breaks ties.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocumentRevision {
    pub thing_revision: u64,
    pub policy_revision: u64,
}

impl DocumentRevision {
    pub fn new(thing_revision: u64, policy_revision: u64) -> Self {
        Self {
            thing_revision,
            policy_revision,
        }
    }
}

/// Conditional predicate attached to every bulk operation.
///
/// An operation passes when no document with `document_id` is stored, or the
/// stored revision is strictly lower than `revision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionFilter {
    pub document_id: String,
    pub revision: DocumentRevision,
}

impl RevisionFilter {
    pub fn new(document_id: impl Into<String>, revision: DocumentRevision) -> Self {
        Self {
            document_id: document_id.into(),
            revision,
        }
    }

    /// Evaluates the predicate against the stored revision, if any.
    pub fn admits(&self, stored: Option<DocumentRevision>) -> bool {
        stored.map_or(true, |stored| stored < self.revision)
    }
}

/// What to do when the filter passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    /// Replace the document with this body.
    Upsert(Value),
    /// Remove the document.
    Delete,
}

/// One conditional write within a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOperation {
    pub filter: RevisionFilter,
    pub action: BulkAction,
}

impl BulkOperation {
    pub fn upsert(document_id: impl Into<String>, revision: DocumentRevision, body: Value) -> Self {
        Self {
            filter: RevisionFilter::new(document_id, revision),
            action: BulkAction::Upsert(body),
        }
    }

    pub fn delete(document_id: impl Into<String>, revision: DocumentRevision) -> Self {
        Self {
            filter: RevisionFilter::new(document_id, revision),
            action: BulkAction::Delete,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.filter.document_id
    }
}

/// Per-operation outcome of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkItemResult {
    /// The filter passed and the write took effect.
    Applied,
    /// A document with an equal or newer revision is stored; nothing changed.
    Stale,
    /// The operation failed.
    Failed(StorageError),
}

/// A document as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub revision: DocumentRevision,
    pub body: Value,
}

/// Store health report.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency: Duration,
    pub message: Option<String>,
}

/// Abstract document store with conditional bulk writes.
///
/// Implementations must be thread-safe (Send + Sync). Each operation of a
/// bulk request is applied atomically on its own; the request as a whole is
/// not atomic.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Executes `operations` in order.
    ///
    /// The returned vector has exactly one entry per operation, in submission
    /// order. An `Err` means the whole request failed and no per-item result
    /// is known.
    async fn bulk_execute(
        &self,
        operations: Vec<BulkOperation>,
    ) -> StorageResult<Vec<BulkItemResult>>;

    /// Reads a document by id.
    async fn get_document(&self, document_id: &str) -> StorageResult<Option<StoredDocument>>;

    /// Reports whether the store is reachable.
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}

/// Validates a document id.
pub fn validate_document_id(document_id: &str) -> StorageResult<()> {
    if document_id.is_empty() {
        return Err(StorageError::InvalidInput {
            message: "document id cannot be empty".to_string(),
        });
    }
    if document_id.len() > MAX_DOCUMENT_ID_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!(
                "document id exceeds maximum length of {MAX_DOCUMENT_ID_LENGTH} characters"
            ),
        });
    }
    Ok(())
}
