//! In-memory storage implementation.
//!
//! Each document lives in a `DashMap` shard; the revision check and the write
//! happen under the same entry guard, so the conditional write is atomic per
//! document without any store-wide lock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{instrument, trace};

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_document_id, BulkAction, BulkItemResult, BulkOperation, DocumentStore, HealthStatus,
    StoredDocument,
};

/// Default cap on a serialized document body.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// In-memory implementation of DocumentStore.
///
/// # Performance Characteristics
///
/// - **Upsert / delete**: O(1) average per operation (DashMap entry)
/// - **Get**: O(1) average
#[derive(Debug)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, StoredDocument>,
    max_document_bytes: usize,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self {
            documents: DashMap::new(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl MemoryDocumentStore {
    /// Creates a new in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory document store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Rejects upserts whose serialized body is larger than `bytes`.
    pub fn with_max_document_bytes(mut self, bytes: usize) -> Self {
        self.max_document_bytes = bytes;
        self
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn apply(&self, operation: BulkOperation) -> BulkItemResult {
        if let Err(e) = validate_document_id(operation.document_id()) {
            return BulkItemResult::Failed(e);
        }
        let BulkOperation { filter, action } = operation;

        match action {
            BulkAction::Upsert(body) => {
                if !body.is_object() {
                    return BulkItemResult::Failed(StorageError::InvalidDocument {
                        document_id: filter.document_id,
                        message: "document body must be a json object".to_string(),
                    });
                }
                let size = match serde_json::to_vec(&body) {
                    Ok(bytes) => bytes.len(),
                    Err(e) => {
                        return BulkItemResult::Failed(StorageError::SerializationError {
                            message: e.to_string(),
                        })
                    }
                };
                if size > self.max_document_bytes {
                    return BulkItemResult::Failed(StorageError::InvalidDocument {
                        document_id: filter.document_id,
                        message: format!(
                            "document of {size} bytes exceeds limit of {} bytes",
                            self.max_document_bytes
                        ),
                    });
                }

                let document = StoredDocument {
                    id: filter.document_id.clone(),
                    revision: filter.revision,
                    body,
                };
                match self.documents.entry(filter.document_id.clone()) {
                    Entry::Occupied(mut entry) => {
                        if filter.admits(Some(entry.get().revision)) {
                            entry.insert(document);
                            BulkItemResult::Applied
                        } else {
                            BulkItemResult::Stale
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(document);
                        BulkItemResult::Applied
                    }
                }
            }
            BulkAction::Delete => match self.documents.entry(filter.document_id.clone()) {
                Entry::Occupied(entry) => {
                    if filter.admits(Some(entry.get().revision)) {
                        entry.remove();
                        BulkItemResult::Applied
                    } else {
                        BulkItemResult::Stale
                    }
                }
                // Nothing to delete; the end state already matches.
                Entry::Vacant(_) => BulkItemResult::Applied,
            },
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    #[instrument(skip(self, operations), fields(operations = operations.len()))]
    async fn bulk_execute(
        &self,
        operations: Vec<BulkOperation>,
    ) -> StorageResult<Vec<BulkItemResult>> {
        let results: Vec<BulkItemResult> = operations
            .into_iter()
            .map(|operation| self.apply(operation))
            .collect();
        trace!(results = ?results, "bulk request executed");
        Ok(results)
    }

    async fn get_document(&self, document_id: &str) -> StorageResult<Option<StoredDocument>> {
        validate_document_id(document_id)?;
        Ok(self.documents.get(document_id).map(|d| d.value().clone()))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        // No external dependencies to reach.
        Ok(HealthStatus {
            healthy: true,
            latency: Duration::ZERO,
            message: Some("memory".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DocumentRevision;
    use serde_json::json;

    fn rev(thing: u64) -> DocumentRevision {
        DocumentRevision::new(thing, 0)
    }

    #[tokio::test]
    async fn test_upsert_into_empty_store_is_applied() {
        let store = MemoryDocumentStore::new();
        let results = store
            .bulk_execute(vec![BulkOperation::upsert("t", rev(1), json!({"a": 1}))])
            .await
            .unwrap();
        assert_eq!(results, vec![BulkItemResult::Applied]);
        let stored = store.get_document("t").await.unwrap().unwrap();
        assert_eq!(stored.revision, rev(1));
        assert_eq!(stored.body, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_same_revision_twice_is_stale() {
        let store = MemoryDocumentStore::new();
        let op = BulkOperation::upsert("t", rev(3), json!({"a": 1}));
        let first = store.bulk_execute(vec![op.clone()]).await.unwrap();
        let second = store.bulk_execute(vec![op]).await.unwrap();
        assert_eq!(first, vec![BulkItemResult::Applied]);
        assert_eq!(second, vec![BulkItemResult::Stale]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_older_upsert_leaves_newer_document() {
        let store = MemoryDocumentStore::new();
        store
            .bulk_execute(vec![BulkOperation::upsert("t", rev(5), json!({"v": 5}))])
            .await
            .unwrap();
        let results = store
            .bulk_execute(vec![BulkOperation::upsert("t", rev(3), json!({"v": 3}))])
            .await
            .unwrap();
        assert_eq!(results, vec![BulkItemResult::Stale]);
        let stored = store.get_document("t").await.unwrap().unwrap();
        assert_eq!(stored.body, json!({"v": 5}));
    }

    #[tokio::test]
    async fn test_policy_revision_breaks_ties() {
        let store = MemoryDocumentStore::new();
        store
            .bulk_execute(vec![BulkOperation::upsert(
                "t",
                DocumentRevision::new(2, 1),
                json!({"p": 1}),
            )])
            .await
            .unwrap();
        let results = store
            .bulk_execute(vec![
                BulkOperation::upsert("t", DocumentRevision::new(2, 2), json!({"p": 2})),
                BulkOperation::upsert("t", DocumentRevision::new(1, 9), json!({"p": 9})),
            ])
            .await
            .unwrap();
        assert_eq!(results, vec![BulkItemResult::Applied, BulkItemResult::Stale]);
        let stored = store.get_document("t").await.unwrap().unwrap();
        assert_eq!(stored.body, json!({"p": 2}));
    }

    #[tokio::test]
    async fn test_delete_respects_revision() {
        let store = MemoryDocumentStore::new();
        store
            .bulk_execute(vec![BulkOperation::upsert("t", rev(4), json!({}))])
            .await
            .unwrap();

        let stale = store
            .bulk_execute(vec![BulkOperation::delete("t", rev(4))])
            .await
            .unwrap();
        assert_eq!(stale, vec![BulkItemResult::Stale]);
        assert!(store.get_document("t").await.unwrap().is_some());

        let applied = store
            .bulk_execute(vec![BulkOperation::delete("t", rev(5))])
            .await
            .unwrap();
        assert_eq!(applied, vec![BulkItemResult::Applied]);
        assert!(store.get_document("t").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_of_absent_document_is_applied() {
        let store = MemoryDocumentStore::new();
        let results = store
            .bulk_execute(vec![BulkOperation::delete("missing", rev(1))])
            .await
            .unwrap();
        assert_eq!(results, vec![BulkItemResult::Applied]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_does_not_affect_neighbours() {
        let store = MemoryDocumentStore::new().with_max_document_bytes(64);
        let results = store
            .bulk_execute(vec![
                BulkOperation::upsert("a", rev(1), json!({"x": 1})),
                BulkOperation::upsert("b", rev(1), json!({"x": "y".repeat(100)})),
                BulkOperation::upsert("", rev(1), json!({})),
                BulkOperation::upsert("c", rev(1), json!([1])),
                BulkOperation::upsert("d", rev(1), json!({"x": 4})),
            ])
            .await
            .unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0], BulkItemResult::Applied);
        assert!(matches!(
            results[1],
            BulkItemResult::Failed(StorageError::InvalidDocument { .. })
        ));
        assert!(matches!(
            results[2],
            BulkItemResult::Failed(StorageError::InvalidInput { .. })
        ));
        assert!(matches!(
            results[3],
            BulkItemResult::Failed(StorageError::InvalidDocument { .. })
        ));
        assert_eq!(results[4], BulkItemResult::Applied);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_health_check_reports_healthy() {
        let store = MemoryDocumentStore::new();
        let status = store.health_check().await.unwrap();
        assert!(status.healthy);
        assert_eq!(status.latency, Duration::ZERO);
    }
}
