//! Graceful shutdown on SIGTERM / SIGINT.
//!
//! [`SigDown`] turns the first shutdown signal into a cancelled [`CancellationToken`].
//! The server hands a clone of the token to axum's graceful shutdown, then waits on
//! [`SigDown::recv`] before releasing the store handle.

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Registers the signal listeners.
    ///
    /// Returns an error if signal registration fails.
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let cancellation_token = CancellationToken::new();
        let trigger = cancellation_token.clone();
        let task_tracker = TaskTracker::new();
        task_tracker.spawn(async move {
            let signal_name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
                _ = trigger.cancelled() => return,
            };
            tracing::info!("Received {signal_name}, shutting down");
            trigger.cancel();
        });
        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token,
        })
    }

    /// Returns a clone of the cancellation token for distributing to subsystems.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Triggers shutdown without a signal, e.g. when the server exits on its own.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Waits for shutdown to be triggered and for the listener task to finish.
    pub async fn recv(&self) {
        self.cancellation_token.cancelled().await;
        self.task_tracker.wait().await;
    }
}
