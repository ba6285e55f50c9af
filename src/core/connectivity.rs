//! Backend connectivity monitoring

use crate::core::provider::HealthCheck;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    Checking,
    Online,
    Offline,
}

impl Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ConnectivityState::Checking => "checking",
                ConnectivityState::Online => "online",
                ConnectivityState::Offline => "offline",
            }
        )
    }
}

/// Periodically probes the backend and publishes the resulting state.
///
/// The background task starts with the monitor and is cancelled when the
/// monitor is stopped or dropped.
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<ConnectivityState>>,
    retry: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectivityMonitor {
    /// Spawns the probe loop. The first check runs immediately, then every
    /// `interval`. Must be called from within a tokio runtime.
    pub fn start(probe: Arc<dyn HealthCheck>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(ConnectivityState::Checking);
        let state = Arc::new(tx);
        let retry = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_probe_loop(
            probe,
            Arc::clone(&state),
            Arc::clone(&retry),
            cancel.clone(),
            interval,
        ));

        Self {
            state,
            retry,
            cancel,
            task: Some(task),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Requests an immediate health check, e.g. from a user-triggered retry.
    pub fn retry(&self) {
        debug!("Manual connectivity retry requested");
        self.retry.notify_one();
    }

    /// Marks the backend offline after a failed primary fetch.
    pub fn report_failure(&self) {
        transition(&self.state, ConnectivityState::Offline);
    }

    /// Cancels the probe loop and waits for it to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Connectivity monitor task ended abnormally");
            }
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn transition(state: &watch::Sender<ConnectivityState>, next: ConnectivityState) {
    let changed = state.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
    if changed {
        info!(state = %next, "Backend connectivity changed");
    }
}

async fn run_probe_loop(
    probe: Arc<dyn HealthCheck>,
    state: Arc<watch::Sender<ConnectivityState>>,
    retry: Arc<Notify>,
    cancel: CancellationToken,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = retry.notified() => ticker.reset(),
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = probe.health_check() => outcome,
        };

        match outcome {
            Ok(()) => transition(&state, ConnectivityState::Online),
            Err(e) => {
                debug!(error = %e, "Health check failed");
                transition(&state, ConnectivityState::Offline);
            }
        }
    }
    debug!("Connectivity monitor stopped");
}
