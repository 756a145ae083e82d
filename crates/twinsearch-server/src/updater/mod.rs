//! Batched search index updater.
//!
//! Turns a stream of write models into conditional bulk requests against a
//! [`DocumentStore`](twinsearch_storage::DocumentStore):
//!
//! 1. **Batching**: size-or-time bounded batches
//! 2. **Bounded parallelism**: at most `parallelism` bulk requests in flight
//! 3. **Selective retry**: transient per-item failures are resubmitted with
//!    exponential backoff, batch-mates keep their outcome
//!
//! Every write carries its `(thing, policy)` revision as a filter, so the
//! store converges to the newest state regardless of completion order.

mod adapter;
mod engine;
mod events;
mod retry;
mod shutdown;
mod types;

pub use engine::SearchUpdater;
pub use events::ThingEvent;
pub use retry::RetryPolicy;
pub use shutdown::{ShutdownHandle, ShutdownMode};
pub use types::{
    FailureReason, ItemOutcome, Outcome, UpdaterConfig, UpdaterError, DEFAULT_MAX_BATCH_SIZE,
};
