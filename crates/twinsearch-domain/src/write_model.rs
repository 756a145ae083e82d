//! Pending index mutations.

use crate::document::ThingDocument;
use crate::metadata::Metadata;

/// A pending index mutation for one twin.
///
/// Write models are immutable once built; a newer state of the same twin is
/// a new write model with a higher revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteModel {
    /// Replace the indexed document if the stored one is older.
    Upsert {
        document: ThingDocument,
        metadata: Metadata,
    },
    /// Remove the indexed document if the stored one is older.
    Delete { metadata: Metadata },
}

impl WriteModel {
    pub fn metadata(&self) -> &Metadata {
        match self {
            WriteModel::Upsert { metadata, .. } | WriteModel::Delete { metadata } => metadata,
        }
    }

    pub fn thing_id(&self) -> &str {
        self.metadata().thing_id()
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, WriteModel::Delete { .. })
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WriteModel::Upsert { .. } => "upsert",
            WriteModel::Delete { .. } => "delete",
        }
    }
}
