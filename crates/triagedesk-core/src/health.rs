//! Backend connectivity monitor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::service::Backend;

/// Connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// A check is running.
    Checking,
    /// The last check succeeded.
    Connected,
    /// The last check failed.
    Disconnected,
}

impl HealthState {
    /// Label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Checking => "Checking...",
            Self::Connected => "API Connected",
            Self::Disconnected => "API Disconnected",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Latest health observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    /// Current state.
    pub state: HealthState,
    /// When the last check finished.
    pub last_checked: Option<DateTime<Utc>>,
}

/// Polls the health endpoint and publishes the result on a watch channel.
pub struct HealthMonitor {
    backend: Arc<dyn Backend>,
    interval: Duration,
    status: watch::Sender<HealthStatus>,
    cancel: CancellationToken,
}

impl HealthMonitor {
    /// Creates a monitor in the checking state.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        let (status, _) = watch::channel(HealthStatus {
            state: HealthState::Checking,
            last_checked: None,
        });
        Self {
            backend,
            interval: config.health_check_interval,
            status,
            cancel: CancellationToken::new(),
        }
    }

    /// Receiver for status changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<HealthStatus> {
        self.status.subscribe()
    }

    /// Latest status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        *self.status.borrow()
    }

    /// Runs one check and publishes the result.
    pub async fn check(&self) -> HealthState {
        let previous = self.status().state;
        self.status.send_modify(|s| s.state = HealthState::Checking);

        let token = self.cancel.child_token();
        let state = match self.backend.health(&token).await {
            Ok(health) => {
                debug!(status = %health.status, service = %health.service, "Backend healthy");
                HealthState::Connected
            }
            Err(e) if e.is_cancelled() => {
                self.status.send_modify(|s| s.state = previous);
                return previous;
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                HealthState::Disconnected
            }
        };

        self.status.send_replace(HealthStatus {
            state,
            last_checked: Some(Utc::now()),
        });
        if previous != state && state == HealthState::Connected {
            info!("Backend reachable");
        }
        state
    }

    /// Checks now and then every interval until [`dispose`](Self::dispose).
    #[must_use = "the handle can be awaited after dispose"]
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = monitor.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.check().await;
                    }
                }
            }
        })
    }

    /// Stops the loop.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
