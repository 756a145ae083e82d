//! twinsearch-storage: Document store abstraction layer
//!
//! This crate provides the storage abstraction for the twin search index:
//! - DocumentStore trait with conditional bulk upsert/delete
//! - Revision filters that make stale writes no-ops
//! - In-memory implementation for testing and single-node use
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             twinsearch-storage               │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DocumentStore definition     │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - Transient/permanent errors   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDocumentStore;
pub use traits::{
    validate_document_id, BulkAction, BulkItemResult, BulkOperation, DocumentRevision,
    DocumentStore, HealthStatus, RevisionFilter, StoredDocument, MAX_DOCUMENT_ID_LENGTH,
};
