//! Cooperative shutdown for running pipelines.

use std::sync::Arc;

use tokio::sync::watch;

/// Shutdown state. Only ever moves forward: Running -> Graceful -> Abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShutdownMode {
    Running,
    /// Stop pulling input and drain what was already accepted.
    Graceful,
    /// Stop pulling input and cancel every item not yet resolved.
    Abort,
}

/// Handle used to stop every pipeline started from one updater.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<ShutdownMode>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ShutdownMode::Running);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Requests a graceful stop.
    pub fn shutdown(&self) {
        self.escalate(ShutdownMode::Graceful);
    }

    /// Requests an abort. Overrides an earlier graceful request.
    pub fn abort(&self) {
        self.escalate(ShutdownMode::Abort);
    }

    pub fn mode(&self) -> ShutdownMode {
        *self.sender.borrow()
    }

    pub fn is_aborted(&self) -> bool {
        self.mode() == ShutdownMode::Abort
    }

    /// Resolves once the mode reaches at least `mode`.
    pub async fn wait_for(&self, mode: ShutdownMode) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow_and_update() >= mode {
                return;
            }
            if receiver.changed().await.is_err() {
                // The sender lives as long as this handle.
                std::future::pending::<()>().await;
            }
        }
    }

    fn escalate(&self, mode: ShutdownMode) {
        self.sender.send_if_modified(|current| {
            if *current < mode {
                *current = mode;
                true
            } else {
                false
            }
        });
    }
}
