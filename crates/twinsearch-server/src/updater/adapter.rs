//! Translation from write models to conditional bulk operations.

use twinsearch_domain::WriteModel;
use twinsearch_storage::{BulkOperation, DocumentRevision, StorageError};

/// Builds the store operation for `model`.
///
/// The revision filter always carries the model's `(thing, policy)`
/// revision, so the store alone decides whether the write is current.
pub(crate) fn to_bulk_operation(model: &WriteModel) -> Result<BulkOperation, StorageError> {
    let metadata = model.metadata();
    let (thing_revision, policy_revision) = metadata.revision_key();
    let revision = DocumentRevision::new(thing_revision, policy_revision);

    match model {
        WriteModel::Upsert { document, .. } => {
            let body = document
                .to_json()
                .map_err(|e| StorageError::SerializationError {
                    message: format!("{}: {e}", metadata.thing_id()),
                })?;
            Ok(BulkOperation::upsert(metadata.thing_id(), revision, body))
        }
        WriteModel::Delete { .. } => Ok(BulkOperation::delete(metadata.thing_id(), revision)),
    }
}
