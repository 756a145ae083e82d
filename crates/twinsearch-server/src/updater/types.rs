//! Data types for the search updater.

use std::time::Duration;

use twinsearch_domain::MappingError;
use twinsearch_storage::StorageError;

use super::retry::RetryPolicy;

/// Default maximum number of write models per bulk request.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 250;

/// Why a write model could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The twin could not be turned into a write model.
    Mapping(MappingError),
    /// The store rejected the item for good.
    Permanent(StorageError),
    /// Transient failures persisted past the attempt budget.
    RetriesExhausted {
        attempts: u32,
        last_error: StorageError,
    },
    /// The updater was aborted before the item was resolved.
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Mapping(e) => write!(f, "mapping failed: {e}"),
            FailureReason::Permanent(e) => write!(f, "store rejected item: {e}"),
            FailureReason::RetriesExhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {attempts} attempts: {last_error}"),
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal result for one write model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The store took the write.
    Applied,
    /// An equal or newer revision was already stored; nothing changed.
    Stale,
    /// The write did not take effect.
    Failed(FailureReason),
}

impl Outcome {
    /// Applied and Stale both mean the index is at least as new as the item.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }

    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Stale => "stale",
            Outcome::Failed(FailureReason::Mapping(_)) => "mapping_failed",
            Outcome::Failed(FailureReason::Permanent(_)) => "permanent_failure",
            Outcome::Failed(FailureReason::RetriesExhausted { .. }) => "retries_exhausted",
            Outcome::Failed(FailureReason::Cancelled) => "cancelled",
        }
    }
}

/// Outcome of one submitted item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemOutcome {
    /// Position of the item in the input stream, starting at 0.
    pub sequence: u64,
    /// Twin id, unknown when mapping failed.
    pub thing_id: Option<String>,
    pub outcome: Outcome,
    /// Store attempts made for this item (0 if it never reached the store).
    pub attempts: u32,
}

/// Configuration for the search updater.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Maximum write models per bulk request.
    pub max_batch_size: usize,
    /// Maximum time a batch waits for more items after its first one.
    pub max_wait: Duration,
    /// Maximum bulk requests in flight.
    pub parallelism: usize,
    /// Retry policy for transient store failures.
    pub retry: RetryPolicy,
    /// Deadline for a single bulk request.
    pub store_timeout: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_wait: Duration::from_secs(1),
            parallelism: 4,
            retry: RetryPolicy::default(),
            store_timeout: Duration::from_secs(30),
        }
    }
}

impl UpdaterConfig {
    /// One item per batch, no waiting, one batch at a time.
    pub fn minimal() -> Self {
        Self {
            max_batch_size: 1,
            max_wait: Duration::ZERO,
            parallelism: 1,
            ..Self::default()
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Checks the configuration for values the updater cannot run with.
    pub fn validate(&self) -> Result<(), UpdaterError> {
        if self.max_batch_size == 0 {
            return Err(UpdaterError::InvalidConfig {
                message: "max_batch_size must be greater than 0".to_string(),
            });
        }
        if self.parallelism == 0 {
            return Err(UpdaterError::InvalidConfig {
                message: "parallelism must be greater than 0".to_string(),
            });
        }
        self.retry.validate()
    }
}

/// Errors raised while setting up the updater.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpdaterError {
    /// The configuration cannot be used.
    #[error("invalid updater configuration: {message}")]
    InvalidConfig { message: String },
}
