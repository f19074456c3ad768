//! Debounced scheduling: only the last trigger within a quiet window runs.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default quiet window for numeric input changes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(220);

/// Schedules work after a quiet window, superseding any pending work.
///
/// Each [`trigger`](Self::trigger) cancels the previously scheduled task
/// before scheduling its own. Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `task` to run once the window elapses without another trigger.
    ///
    /// The returned handle resolves to `true` if the task ran and `false` if
    /// it was superseded or cancelled.
    pub fn trigger<F>(&self, task: F) -> JoinHandle<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        self.replace_pending(Some(token.clone()));

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(delay) => {
                    task();
                    true
                }
            }
        })
    }

    /// Cancels the pending task, if any.
    pub fn cancel(&self) {
        self.replace_pending(None);
    }

    fn replace_pending(&self, next: Option<CancellationToken>) {
        let previous = match self.pending.lock() {
            Ok(mut pending) => std::mem::replace(&mut *pending, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
