//! twinsearch-server: The search index update pipeline
//!
//! This crate wires the domain mapper to a document store:
//! - Search updater: batching, bounded parallelism, selective retry
//! - Twin change events and their mapping into write models
//! - Configuration management
//! - Logging and metrics setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             twinsearch-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs       - Configuration management │
//! │  observability/  - Logging and metrics      │
//! │  updater/        - Update pipeline          │
//! │    engine.rs   - Batching and execution     │
//! │    retry.rs    - Backoff policy             │
//! │    shutdown.rs - Graceful / abort stop      │
//! │    events.rs   - Twin change events         │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod observability;
pub mod updater;

// Re-exports for convenience
pub use config::{ConfigLoadError, TwinsearchConfig};
pub use updater::{
    FailureReason, ItemOutcome, Outcome, RetryPolicy, SearchUpdater, ShutdownHandle, ThingEvent,
    UpdaterConfig, UpdaterError,
};
