//! Storage Integration Tests.
//!
//! These tests exercise the conditional-write contract of `DocumentStore`
//! through the public API, including concurrent and reordered writers.

use std::sync::Arc;

use futures::future::join_all;
use proptest::prelude::*;
use serde_json::json;
use twinsearch_storage::{
    BulkItemResult, BulkOperation, DocumentRevision, DocumentStore, MemoryDocumentStore,
};

fn upsert(id: &str, revision: u64) -> BulkOperation {
    BulkOperation::upsert(
        id,
        DocumentRevision::new(revision, 0),
        json!({"_id": id, "_revision": revision}),
    )
}

/// Helper function to run the conditional-write contract against any DocumentStore.
async fn run_conditional_write_contract<S: DocumentStore>(store: &S) {
    // Results come back in submission order, one per operation
    let results = store
        .bulk_execute(vec![upsert("a", 1), upsert("b", 1), upsert("a", 2), upsert("a", 1)])
        .await
        .unwrap();
    assert_eq!(
        results,
        vec![
            BulkItemResult::Applied,
            BulkItemResult::Applied,
            BulkItemResult::Applied,
            BulkItemResult::Stale,
        ]
    );

    let a = store.get_document("a").await.unwrap().unwrap();
    assert_eq!(a.revision, DocumentRevision::new(2, 0));

    // Older delete is stale, newer delete removes
    let results = store
        .bulk_execute(vec![
            BulkOperation::delete("a", DocumentRevision::new(2, 0)),
            BulkOperation::delete("b", DocumentRevision::new(2, 0)),
        ])
        .await
        .unwrap();
    assert_eq!(results, vec![BulkItemResult::Stale, BulkItemResult::Applied]);
    assert!(store.get_document("a").await.unwrap().is_some());
    assert!(store.get_document("b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_store_honours_conditional_write_contract() {
    run_conditional_write_contract(&MemoryDocumentStore::new()).await;
}

#[tokio::test]
async fn test_concurrent_writers_converge_on_highest_revision() {
    let store = MemoryDocumentStore::new_shared();

    let writers = (1..=64u64).rev().map(|revision| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.bulk_execute(vec![upsert("hot", revision)]).await })
    });
    let results = join_all(writers).await;

    let applied = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .filter(|r| r[0] == BulkItemResult::Applied)
        .count();
    assert!(applied >= 1);

    let stored = store.get_document("hot").await.unwrap().unwrap();
    assert_eq!(stored.revision, DocumentRevision::new(64, 0));
}

proptest! {
    #[test]
    fn test_any_arrival_order_keeps_the_maximum_revision(
        revisions in prop::collection::vec(0u64..50, 1..20)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let store = MemoryDocumentStore::new();
        let ops: Vec<_> = revisions.iter().map(|r| upsert("t", *r)).collect();
        let results = rt.block_on(store.bulk_execute(ops)).unwrap();
        prop_assert_eq!(results.len(), revisions.len());

        // An item is applied exactly when it beats everything before it
        let mut best: Option<u64> = None;
        for (revision, result) in revisions.iter().zip(&results) {
            let expected = if best.map_or(true, |b| b < *revision) {
                best = Some(*revision);
                BulkItemResult::Applied
            } else {
                BulkItemResult::Stale
            };
            prop_assert_eq!(result, &expected);
        }

        let stored = rt.block_on(store.get_document("t")).unwrap().unwrap();
        prop_assert_eq!(stored.revision.thing_revision, *revisions.iter().max().unwrap());
    }
}
