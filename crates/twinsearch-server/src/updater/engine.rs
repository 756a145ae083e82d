//! Search updater implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tracing::{debug, instrument, warn};
use twinsearch_domain::{EnforcedThingMapper, MappingResult, WriteModel};
use twinsearch_storage::{BulkItemResult, BulkOperation, DocumentStore, StorageError};

use super::adapter::to_bulk_operation;
use super::events::ThingEvent;
use super::shutdown::{ShutdownHandle, ShutdownMode};
use super::types::{FailureReason, ItemOutcome, Outcome, UpdaterConfig, UpdaterError};
use crate::observability::{BATCH_SIZE, BULK_DURATION_SECONDS, OUTCOMES_TOTAL, RETRIES_TOTAL};

/// An input item tagged with its position in the input stream.
type Sequenced = (u64, MappingResult<WriteModel>);

/// A write model waiting for a store answer.
struct Pending {
    sequence: u64,
    thing_id: String,
    operation: BulkOperation,
}

/// Batched, ordering-safe index updater.
///
/// Pulls write models from a stream, groups them into bulk requests and
/// reports one [`ItemOutcome`] per pulled item:
///
/// 1. **Batching**: up to `max_batch_size` items, or whatever arrived within
///    `max_wait` of a batch's first item
/// 2. **Bounded concurrency**: at most `parallelism` bulk requests in flight;
///    the input is not pulled while the bound is reached
/// 3. **Retry**: only the transiently failed items of a batch are resubmitted
///
/// Ordering is never enforced here. Every operation carries its revision and
/// the store drops anything not strictly newer than what it holds, so
/// batches may complete in any order.
pub struct SearchUpdater<S: DocumentStore> {
    inner: Arc<Inner<S>>,
}

impl<S: DocumentStore> Clone for SearchUpdater<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    store: Arc<S>,
    config: UpdaterConfig,
    mapper: EnforcedThingMapper,
    shutdown: ShutdownHandle,
}

impl<S: DocumentStore> SearchUpdater<S> {
    /// Creates an updater writing to `store`.
    pub fn new(store: Arc<S>, config: UpdaterConfig) -> Result<Self, UpdaterError> {
        Self::with_mapper(store, config, EnforcedThingMapper::default())
    }

    /// Creates an updater that maps [`ThingEvent`]s with `mapper`.
    pub fn with_mapper(
        store: Arc<S>,
        config: UpdaterConfig,
        mapper: EnforcedThingMapper,
    ) -> Result<Self, UpdaterError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                config,
                mapper,
                shutdown: ShutdownHandle::new(),
            }),
        })
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// Handle stopping every pipeline of this updater.
    ///
    /// Shutdown is permanent: pipelines started afterwards end immediately.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.inner.shutdown.clone()
    }

    /// Runs the pipeline over `input`.
    ///
    /// Within a batch, outcomes are yielded in input order. Batches complete
    /// in any order, so use [`ItemOutcome::sequence`] to correlate across
    /// them. The stream ends once the input is exhausted (or shutdown was
    /// requested) and every pulled item has been resolved. Items left in
    /// `input` after shutdown are never pulled and stay with the caller.
    pub fn run<I>(&self, input: I) -> BoxStream<'static, ItemOutcome>
    where
        I: Stream<Item = MappingResult<WriteModel>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let config = &self.inner.config;
        let shutdown = self.inner.shutdown.clone();

        let stop = async move { shutdown.wait_for(ShutdownMode::Graceful).await };
        let sequenced = input
            .take_until(stop)
            .enumerate()
            .map(|(index, item)| (index as u64, item));

        batches(sequenced, config.max_batch_size, config.max_wait)
            .map(move |batch| {
                let inner = Arc::clone(&inner);
                async move { inner.execute_batch(batch).await }
            })
            .buffer_unordered(config.parallelism)
            .flat_map(stream::iter)
            .boxed()
    }

    /// Maps `events` with this updater's mapper and runs the pipeline.
    pub fn run_events<I>(&self, events: I) -> BoxStream<'static, ItemOutcome>
    where
        I: Stream<Item = ThingEvent> + Send + 'static,
    {
        let mapper = self.inner.mapper.clone();
        self.run(events.map(move |event| event.into_write_model(&mapper)))
    }

    /// Runs `items` to completion and returns one outcome per item, in
    /// input order.
    ///
    /// Items the pipeline never pulled because of a shutdown are reported as
    /// [`FailureReason::Cancelled`] with zero attempts.
    pub async fn submit(&self, items: Vec<MappingResult<WriteModel>>) -> Vec<ItemOutcome> {
        let thing_ids: Vec<Option<String>> = items
            .iter()
            .map(|item| item.as_ref().ok().map(|model| model.thing_id().to_string()))
            .collect();

        let mut outcomes: Vec<ItemOutcome> = self.run(stream::iter(items)).collect().await;
        if outcomes.len() < thing_ids.len() {
            let mut resolved = vec![false; thing_ids.len()];
            for outcome in &outcomes {
                if let Some(slot) = resolved.get_mut(outcome.sequence as usize) {
                    *slot = true;
                }
            }
            debug!(
                unresolved = thing_ids.len() - outcomes.len(),
                "cancelling items not pulled before shutdown"
            );
            for (index, thing_id) in thing_ids.into_iter().enumerate() {
                if !resolved[index] {
                    outcomes.push(resolve(
                        index as u64,
                        thing_id,
                        Outcome::Failed(FailureReason::Cancelled),
                        0,
                    ));
                }
            }
        }
        outcomes.sort_by_key(|o| o.sequence);
        outcomes
    }
}

impl<S: DocumentStore> Inner<S> {
    #[instrument(skip_all, fields(items = batch.len()))]
    async fn execute_batch(&self, batch: Vec<Sequenced>) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut pending = Vec::with_capacity(batch.len());

        for (sequence, item) in batch {
            let model = match item {
                Ok(model) => model,
                Err(e) => {
                    outcomes.push(resolve(
                        sequence,
                        None,
                        Outcome::Failed(FailureReason::Mapping(e)),
                        0,
                    ));
                    continue;
                }
            };
            match to_bulk_operation(&model) {
                Ok(operation) => pending.push(Pending {
                    sequence,
                    thing_id: model.thing_id().to_string(),
                    operation,
                }),
                Err(e) => outcomes.push(resolve(
                    sequence,
                    Some(model.thing_id().to_string()),
                    Outcome::Failed(FailureReason::Permanent(e)),
                    0,
                )),
            }
        }

        let mut attempts = 0u32;
        while !pending.is_empty() {
            if self.shutdown.is_aborted() {
                debug!(items = pending.len(), "cancelling unresolved items");
                outcomes.extend(pending.drain(..).map(|p| {
                    resolve(
                        p.sequence,
                        Some(p.thing_id),
                        Outcome::Failed(FailureReason::Cancelled),
                        attempts,
                    )
                }));
                break;
            }

            attempts += 1;
            let results = self.bulk_execute(&pending).await;

            let mut retry = Vec::new();
            for (item, result) in pending.drain(..).zip(results) {
                let outcome = match result {
                    BulkItemResult::Applied => Outcome::Applied,
                    BulkItemResult::Stale => Outcome::Stale,
                    BulkItemResult::Failed(e) if e.is_transient() => {
                        if self.config.retry.should_retry(attempts) {
                            retry.push(item);
                            continue;
                        }
                        Outcome::Failed(FailureReason::RetriesExhausted {
                            attempts,
                            last_error: e,
                        })
                    }
                    BulkItemResult::Failed(e) => Outcome::Failed(FailureReason::Permanent(e)),
                };
                outcomes.push(resolve(item.sequence, Some(item.thing_id), outcome, attempts));
            }

            if !retry.is_empty() {
                let backoff = self.config.retry.backoff_for(attempts);
                warn!(
                    items = retry.len(),
                    attempt = attempts,
                    backoff_ms = millis(backoff),
                    "retrying transiently failed items"
                );
                metrics::counter!(RETRIES_TOTAL).increment(retry.len() as u64);
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = self.shutdown.wait_for(ShutdownMode::Abort) => {}
                }
            }
            pending = retry;
        }

        outcomes.sort_by_key(|o| o.sequence);
        outcomes
    }

    /// Sends one bulk request and returns exactly one result per item.
    ///
    /// A failure of the whole request is reported for every item.
    async fn bulk_execute(&self, pending: &[Pending]) -> Vec<BulkItemResult> {
        let operations: Vec<BulkOperation> = pending.iter().map(|p| p.operation.clone()).collect();
        let expected = operations.len();
        metrics::histogram!(BATCH_SIZE).record(expected as f64);

        let started = Instant::now();
        let response =
            match tokio::time::timeout(self.config.store_timeout, self.store.bulk_execute(operations))
                .await
            {
                Ok(response) => response,
                Err(_) => Err(StorageError::Timeout {
                    duration_ms: millis(self.config.store_timeout),
                }),
            };
        metrics::histogram!(BULK_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        match response {
            Ok(results) if results.len() == expected => results,
            Ok(results) => {
                warn!(
                    expected,
                    received = results.len(),
                    "store returned a mismatched result count"
                );
                let error = StorageError::InternalError {
                    message: format!(
                        "store returned {} results for {expected} operations",
                        results.len()
                    ),
                };
                vec![BulkItemResult::Failed(error); expected]
            }
            Err(e) => {
                warn!(error = %e, items = expected, "bulk request failed");
                vec![BulkItemResult::Failed(e); expected]
            }
        }
    }
}

fn resolve(
    sequence: u64,
    thing_id: Option<String>,
    outcome: Outcome,
    attempts: u32,
) -> ItemOutcome {
    metrics::counter!(OUTCOMES_TOTAL, "outcome" => outcome.label()).increment(1);
    if let Outcome::Failed(reason) = &outcome {
        debug!(sequence, thing_id = ?thing_id, %reason, "item failed");
    }
    ItemOutcome {
        sequence,
        thing_id,
        outcome,
        attempts,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Groups `input` into batches of at most `max_size` items.
///
/// A batch is emitted when it is full, when `max_wait` has passed since its
/// first item arrived, or when the input ends. A zero `max_wait` emits every
/// item on its own.
fn batches<I>(input: I, max_size: usize, max_wait: Duration) -> impl Stream<Item = Vec<Sequenced>>
where
    I: Stream<Item = Sequenced> + Send + 'static,
{
    let input = input.fuse().boxed();
    stream::unfold(Some(input), move |state| async move {
        let mut input = state?;
        let first = input.next().await?;
        let mut batch = vec![first];

        if max_wait.is_zero() {
            return Some((batch, Some(input)));
        }

        let deadline = tokio::time::sleep(max_wait);
        tokio::pin!(deadline);
        while batch.len() < max_size {
            tokio::select! {
                biased;
                _ = &mut deadline => break,
                next = input.next() => match next {
                    Some(item) => batch.push(item),
                    None => return Some((batch, None)),
                },
            }
        }
        Some((batch, Some(input)))
    })
}
