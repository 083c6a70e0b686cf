use crate::service::{BackupOutcome, InvocationId};

/// Receives the lifecycle events of backup runs.
///
/// Events of concurrent runs interleave, the [InvocationId] tells them apart.
pub trait BackupObserver: Send + Sync {
    fn started(&self, _id: InvocationId) {}

    /// `done` of `total` packages have been looked at
    fn progress(&self, _id: InvocationId, _done: usize, _total: usize) {}

    fn succeeded(&self, _id: InvocationId, _outcome: &BackupOutcome) {}

    fn failed(&self, _id: InvocationId, _message: &str) {}
}

/// Ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl BackupObserver for NullObserver {}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl BackupObserver for LogObserver {
    fn started(&self, id: InvocationId) {
        log::info!("backup {} started", id);
    }

    fn progress(&self, id: InvocationId, done: usize, total: usize) {
        log::trace!("backup {}: {}/{}", id, done, total);
    }

    fn succeeded(&self, id: InvocationId, outcome: &BackupOutcome) {
        log::info!(
            "backup {} wrote {} apps to {:?}",
            id,
            outcome.counts.total,
            outcome.path
        );
    }

    fn failed(&self, id: InvocationId, message: &str) {
        log::error!("backup {} failed: {}", id, message);
    }
}
