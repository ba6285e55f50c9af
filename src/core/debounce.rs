//! Debouncing for rapid input events

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs only the last of a burst of scheduled actions.
///
/// Each call to [`Debouncer::schedule`] cancels the previous action if its
/// quiet period has not elapsed yet. An action that has already started is
/// left to finish, so a slow action can still complete after a newer one was
/// scheduled.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `action` to run after the quiet period. The returned handle
    /// completes when the action has run or was superseded.
    pub fn schedule<F, Fut>(&self, action: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = pending.replace(token.clone()) {
                previous.cancel();
            }
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Debounced action superseded");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            action().await;
        })
    }

    /// Cancels the pending action, if it has not started yet.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = pending.take() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex as AsyncMutex;

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_last_action_once() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let calls = Arc::new(AsyncMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for amount in [1.0, 12.0, 123.0, 1234.0, 12345.0] {
            let calls = Arc::clone(&calls);
            handles.push(debouncer.schedule(move || async move {
                calls.lock().await.push(amount);
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*calls.lock().await, vec![12345.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_events_all_run() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let calls = Arc::new(AsyncMutex::new(Vec::new()));

        for amount in [1.0, 2.0] {
            let calls = Arc::clone(&calls);
            debouncer.schedule(move || async move {
                calls.lock().await.push(amount);
            });
            tokio::time::sleep(Duration::from_millis(600)).await;
        }

        assert_eq!(*calls.lock().await, vec![1.0, 2.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_action() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let calls = Arc::new(AsyncMutex::new(Vec::<f64>::new()));

        let recorded = Arc::clone(&calls);
        let handle = debouncer.schedule(move || async move {
            recorded.lock().await.push(1.0);
        });
        debouncer.cancel();
        handle.await.unwrap();

        assert!(calls.lock().await.is_empty());
    }
}
