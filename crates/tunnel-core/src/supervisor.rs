//! Tracks every live session task and drives graceful shutdown.
//!
//! Both binaries spawn one task per session through a [`SessionSupervisor`].
//! On Ctrl+C the supervisor cancels its token (each bridge then closes its
//! WebSocket with 1000 and shuts its TCP endpoint down) and waits, up to a
//! grace period, for the tasks to finish.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TrackedFuture;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Shared handle to the set of running session tasks.
///
/// Cheap to clone; all clones see the same tasks and the same shutdown signal.
#[derive(Debug, Clone, Default)]
pub struct SessionSupervisor {
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide shutdown signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// A token cancelled together with the supervisor, for one session.
    pub fn child_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Spawns a session task on the current runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Wraps a future that some other executor spawns (axum runs WebSocket
    /// upgrade callbacks itself) so that shutdown still waits for it.
    pub fn track<F>(&self, task: F) -> TrackedFuture<F>
    where
        F: Future,
    {
        self.tracker.track_future(task)
    }

    /// Number of session tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Signals shutdown and waits up to `grace` for every session to end.
    ///
    /// Returns `true` when all sessions finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shutdown.cancel();
        self.tracker.close();

        let active = self.tracker.len();
        if active > 0 {
            info!("waiting up to {grace:?} for {active} session(s) to close");
        }
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "{} session(s) still running after {grace:?}; exiting anyway",
                    self.tracker.len()
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_waits_for_cancelled_tasks() {
        // Arrange
        let supervisor = SessionSupervisor::new();
        let token = supervisor.child_token();
        supervisor.spawn(async move {
            token.cancelled().await;
        });
        assert_eq!(supervisor.active(), 1);

        // Act
        let clean = supervisor.shutdown(Duration::from_secs(1)).await;

        // Assert
        assert!(clean);
        assert_eq!(supervisor.active(), 0);
        assert!(supervisor.is_shutting_down());
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_grace_period() {
        // Arrange: a task that ignores the shutdown signal
        let supervisor = SessionSupervisor::new();
        supervisor.spawn(std::future::pending::<()>());

        // Act
        let clean = supervisor.shutdown(Duration::from_millis(20)).await;

        // Assert
        assert!(!clean);
    }

    #[tokio::test]
    async fn test_tracked_future_counts_as_active() {
        // Arrange
        let supervisor = SessionSupervisor::new();
        let token = supervisor.child_token();
        let tracked = supervisor.track(async move { token.cancelled().await });
        let handle = tokio::spawn(tracked);

        // Act
        let clean = supervisor.shutdown(Duration::from_secs(1)).await;

        // Assert
        assert!(clean);
        handle.await.unwrap();
    }

    #[test]
    fn test_child_token_follows_shutdown_token() {
        let supervisor = SessionSupervisor::new();
        let child = supervisor.child_token();

        supervisor.shutdown_token().cancel();

        assert!(child.is_cancelled());
    }
}
