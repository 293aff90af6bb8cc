//! Periodic background polling.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::{EmailSyncController, FetchOutcome};

/// Handle to a running poll loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stops scheduling new fetches and cancels the in-flight one.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop and waits for it to wind down.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Poll loop ended abnormally");
        }
    }
}

impl EmailSyncController {
    /// Starts polling: one loading fetch now, then a background fetch every
    /// poll interval.
    ///
    /// A tick that arrives while the previous fetch is still running is
    /// dropped, not queued. The loop ends on [`PollHandle::stop`] or
    /// [`dispose`](Self::dispose).
    #[must_use = "dropping the handle leaves the loop running until dispose"]
    pub fn start_polling(self: &Arc<Self>) -> PollHandle {
        let cancel = self.root.child_token();
        let task = tokio::spawn(Arc::clone(self).poll_loop(cancel.clone()));
        PollHandle { cancel, task }
    }

    async fn poll_loop(self: Arc<Self>, cancel: CancellationToken) {
        let period = self.poll_interval;
        info!(
            interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "Starting email polling"
        );

        let mut in_flight = Some(self.spawn_fetch(true));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
                        debug!("Previous fetch still running, skipping tick");
                        continue;
                    }
                    in_flight = Some(self.spawn_fetch(false));
                }
            }
        }

        self.cancel_in_flight();
        if let Some(task) = in_flight {
            let _ = task.await;
        }
        info!("Email polling stopped");
    }

    fn spawn_fetch(self: &Arc<Self>, show_loading: bool) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            match controller.fetch_emails(show_loading).await {
                Ok(FetchOutcome::Applied(_)) => {}
                Ok(outcome) => debug!(?outcome, "Fetch not applied"),
                // Already recorded on the inbox; the next tick tries again.
                Err(err) => warn!(error = %err, "Poll cycle failed"),
            }
        })
    }
}
