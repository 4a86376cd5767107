//! Save Throttle
//!
//! Rate limiter for the network save path: the first trigger after a quiet
//! period fires immediately, and any further triggers inside the interval
//! coalesce into a single trailing run. The handle owns its worker task
//! explicitly, so teardown is a `cancel()` call rather than whatever
//! happens to get dropped.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
enum Command {
    Trigger,
    Flush,
}

/// Leading-edge, trailing-coalesce rate limiter driving an async action.
///
/// At most one run of the action starts per interval. Triggers are cheap
/// and non-blocking; the action itself runs on a dedicated worker task.
pub struct Throttle {
    tx: mpsc::UnboundedSender<Command>,
    token: CancellationToken,
}

impl Throttle {
    /// Spawn a throttle worker running `action` at most once per `interval`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new<F, Fut>(interval: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        tokio::spawn(run(interval, action, rx, token.clone()));
        Self { tx, token }
    }

    /// Request a run of the action.
    ///
    /// Fires immediately when the throttle is idle; otherwise schedules a
    /// single trailing run at the end of the current interval.
    pub fn trigger(&self) {
        let _ = self.tx.send(Command::Trigger);
    }

    /// Run a pending trailing action now instead of waiting out the
    /// interval. A no-op when nothing is pending.
    pub fn flush(&self) {
        let _ = self.tx.send(Command::Flush);
    }

    /// Stop the worker; a pending trailing run is dropped.
    ///
    /// An action already running is not aborted.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the throttle has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<F, Fut>(
    interval: Duration,
    action: F,
    mut rx: mpsc::UnboundedReceiver<Command>,
    token: CancellationToken,
) where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    'idle: loop {
        let cmd = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            cmd = rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => return,
            },
        };
        if !matches!(cmd, Command::Trigger) {
            // flush with nothing pending
            continue;
        }

        action().await;

        // Coalesce windows until one passes without a trigger
        loop {
            let deadline = Instant::now() + interval;
            let mut pending = false;
            let fire = loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("throttle cancelled with pending run dropped");
                        return;
                    }
                    _ = time::sleep_until(deadline) => break pending,
                    cmd = rx.recv() => match cmd {
                        Some(Command::Trigger) => pending = true,
                        Some(Command::Flush) => {
                            if pending {
                                break true;
                            }
                        }
                        None => return,
                    },
                }
            };
            if !fire {
                continue 'idle;
            }
            action().await;
        }
    }
}
