//! Update pipeline metrics.
//!
//! - `twinsearch_updater_outcomes_total` - Resolved items by `outcome` label
//! - `twinsearch_updater_retries_total` - Items resubmitted after a transient failure
//! - `twinsearch_updater_batch_size` - Items per bulk request
//! - `twinsearch_updater_bulk_duration_seconds` - Bulk request latency

pub const OUTCOMES_TOTAL: &str = "twinsearch_updater_outcomes_total";
pub const RETRIES_TOTAL: &str = "twinsearch_updater_retries_total";
pub const BATCH_SIZE: &str = "twinsearch_updater_batch_size";
pub const BULK_DURATION_SECONDS: &str = "twinsearch_updater_bulk_duration_seconds";

/// Registers descriptions for the updater metrics with the installed recorder.
pub fn describe_updater_metrics() {
    metrics::describe_counter!(
        OUTCOMES_TOTAL,
        "Total number of resolved write models by outcome"
    );
    metrics::describe_counter!(
        RETRIES_TOTAL,
        "Total number of write models resubmitted after a transient store failure"
    );
    metrics::describe_histogram!(BATCH_SIZE, "Number of write models per bulk request");
    metrics::describe_histogram!(
        BULK_DURATION_SECONDS,
        "Bulk request duration in seconds"
    );
}
