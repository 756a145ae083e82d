//! Observability for the updater.
//!
//! This module provides:
//! - Structured logging configuration
//! - Metric names and descriptions for the update pipeline
//!
//! Installing a metrics recorder is left to the embedding process; without
//! one the `metrics` macros are no-ops.

mod logging;
mod metrics;

pub use logging::{create_json_layer, init_logging, LoggingConfig};
pub use metrics::{
    describe_updater_metrics, BATCH_SIZE, BULK_DURATION_SECONDS, OUTCOMES_TOTAL, RETRIES_TOTAL,
};
