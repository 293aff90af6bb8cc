//! Fetching and merging per-email AI analysis.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::inbox::Inbox;
use crate::model::{Enrichment, EnrichmentStatus};
use crate::service::Backend;

/// Fetches analysis by transport id and merges it into the inbox.
///
/// Writes are keyed by id, never by the current selection, so any number of
/// fetches for distinct emails may run at once.
#[derive(Clone)]
pub struct EnrichmentMerger {
    backend: Arc<dyn Backend>,
    inbox: Inbox,
    cancel: CancellationToken,
}

impl EnrichmentMerger {
    /// Creates a merger. Every fetch runs under a child of `cancel`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, inbox: Inbox, cancel: CancellationToken) -> Self {
        Self {
            backend,
            inbox,
            cancel,
        }
    }

    /// Fetches the analysis for `transport_id` and merges it.
    ///
    /// On failure the email keeps no analysis, so calling again is safe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the backend has no analysis yet,
    /// [`Error::Cancelled`] on teardown, or the backend error otherwise.
    pub async fn fetch_and_merge(&self, transport_id: &str) -> Result<Enrichment> {
        let token = self.cancel.child_token();
        self.inbox
            .set_enrichment_status(transport_id, EnrichmentStatus::Loading);

        match self.backend.enrichment(transport_id, &token).await {
            Ok(data) => {
                let enrichment = Enrichment::from(data);
                let matched = self.inbox.merge_enrichment(transport_id, &enrichment);
                debug!(transport_id, matched, "Merged analysis");
                Ok(enrichment)
            }
            Err(err) if err.is_cancelled() => {
                self.inbox.clear_enrichment_status(transport_id);
                Err(Error::Cancelled)
            }
            Err(err) if err.is_not_found() => {
                debug!(transport_id, "Analysis not available yet");
                self.inbox
                    .set_enrichment_status(transport_id, EnrichmentStatus::Unavailable);
                Err(Error::NotFound(format!("analysis for {transport_id}")))
            }
            Err(err) => {
                self.inbox.set_enrichment_status(
                    transport_id,
                    EnrichmentStatus::Failed(err.to_string()),
                );
                Err(err.into())
            }
        }
    }

    /// Runs [`fetch_and_merge`](Self::fetch_and_merge) in the background.
    ///
    /// Failures are logged and recorded as status, never returned.
    #[must_use = "the handle can be awaited or dropped to detach"]
    pub fn spawn_fetch(&self, transport_id: String) -> JoinHandle<()> {
        let merger = self.clone();
        tokio::spawn(async move {
            match merger.fetch_and_merge(&transport_id).await {
                Ok(_) | Err(Error::Cancelled | Error::NotFound(_)) => {}
                Err(err) => warn!(transport_id, error = %err, "Failed to fetch analysis"),
            }
        })
    }
}
