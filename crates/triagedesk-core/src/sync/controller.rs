//! The email list controller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use triagedesk_api::NewEmail;

use super::retry::RetryPolicy;
use crate::config::Config;
use crate::enrichment::EnrichmentMerger;
use crate::error::{Error, Result};
use crate::inbox::Inbox;
use crate::model::Email;
use crate::service::Backend;

/// How a list fetch ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The list was replaced; holds the stored list, newest first.
    Applied(Vec<Email>),
    /// Another fetch was in flight, so this one never started.
    Skipped,
    /// A newer loading fetch took over before this one was applied.
    Superseded,
    /// The controller was disposed.
    Cancelled,
}

impl FetchOutcome {
    /// Returns the stored list if the fetch was applied.
    #[must_use]
    pub fn emails(&self) -> Option<&[Email]> {
        match self {
            Self::Applied(emails) => Some(emails),
            _ => None,
        }
    }
}

/// Keeps the inbox list in sync with the backend and mediates selection.
///
/// At most one list request is in flight per controller. Background fetches
/// are skipped while one runs; loading fetches cancel the running one and
/// take over once it has released.
pub struct EmailSyncController {
    backend: Arc<dyn Backend>,
    inbox: Inbox,
    enrichment: EnrichmentMerger,
    retry: RetryPolicy,
    pub(super) poll_interval: Duration,
    pub(super) root: CancellationToken,
    fetch_slot: Semaphore,
    current: Mutex<CancellationToken>,
    generation: AtomicU64,
}

impl EmailSyncController {
    /// Creates a controller over `inbox`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, inbox: Inbox, config: &Config) -> Self {
        let root = CancellationToken::new();
        let enrichment = EnrichmentMerger::new(Arc::clone(&backend), inbox.clone(), root.clone());
        Self {
            backend,
            inbox,
            enrichment,
            retry: RetryPolicy::from_config(config),
            poll_interval: config.poll_interval,
            current: Mutex::new(root.child_token()),
            root,
            fetch_slot: Semaphore::new(1),
            generation: AtomicU64::new(0),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The inbox this controller writes to.
    #[must_use]
    pub const fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// The merger used for selections.
    #[must_use]
    pub const fn enrichment(&self) -> &EnrichmentMerger {
        &self.enrichment
    }

    /// Configured poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns true once [`dispose`](Self::dispose) ran.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Fetches the list and replaces the inbox with it.
    ///
    /// With `show_loading` false (background) the call is skipped if a fetch
    /// is in flight. With `show_loading` true the in-flight fetch is
    /// cancelled and this one runs after it, toggling the loading flag.
    /// Failures are retried per the policy with the same `show_loading`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetriesExhausted`] once every attempt failed; the
    /// message is also stored as the inbox error. Cancellation is reported
    /// as an outcome, not an error.
    pub async fn fetch_emails(&self, show_loading: bool) -> Result<FetchOutcome> {
        if self.is_disposed() {
            return Ok(FetchOutcome::Cancelled);
        }

        let (_permit, generation) = if show_loading {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.current_token().cancel();
            let permit = tokio::select! {
                biased;
                () = self.root.cancelled() => return Ok(FetchOutcome::Cancelled),
                permit = self.fetch_slot.acquire() => permit.map_err(|_| Error::Cancelled)?,
            };
            (permit, generation)
        } else {
            let Ok(permit) = self.fetch_slot.try_acquire() else {
                debug!("Fetch already in flight, skipping");
                return Ok(FetchOutcome::Skipped);
            };
            (permit, self.generation.load(Ordering::SeqCst))
        };

        self.run_fetch(generation, show_loading).await
    }

    /// User-initiated fetch; always shows loading.
    ///
    /// # Errors
    ///
    /// See [`fetch_emails`](Self::fetch_emails).
    pub async fn refresh_emails(&self) -> Result<FetchOutcome> {
        self.fetch_emails(true).await
    }

    async fn run_fetch(&self, generation: u64, show_loading: bool) -> Result<FetchOutcome> {
        let token = self.root.child_token();
        self.set_current_token(token.clone());
        // A loading fetch may have cancelled the previous token before ours
        // was installed.
        if self.is_stale(generation) {
            return Ok(FetchOutcome::Superseded);
        }

        if show_loading {
            self.inbox.set_loading(true);
        }

        let result = self
            .retry
            .run(&token, |attempt| {
                debug!(attempt, show_loading, "Fetching emails");
                self.backend.list_emails(&token)
            })
            .await;

        if show_loading {
            self.inbox.set_loading(false);
        }

        match result {
            Ok(emails) if !self.is_stale(generation) => {
                let emails = self.inbox.replace_emails(emails);
                info!(count = emails.len(), "Emails updated");
                Ok(FetchOutcome::Applied(emails))
            }
            Ok(_) => Ok(FetchOutcome::Superseded),
            Err(Error::Cancelled) if self.is_disposed() => Ok(FetchOutcome::Cancelled),
            Err(Error::Cancelled) => {
                debug!("Fetch superseded");
                Ok(FetchOutcome::Superseded)
            }
            Err(err) => {
                error!(error = %err, "Failed to fetch emails");
                if !self.is_stale(generation) {
                    self.inbox.set_error(err.to_string());
                }
                Err(err)
            }
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn current_token(&self) -> CancellationToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current_token(&self, token: CancellationToken) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Cancels the in-flight list request, if any.
    pub fn cancel_in_flight(&self) {
        self.current_token().cancel();
    }

    /// Selects `email` and starts fetching its analysis in the background.
    ///
    /// The analysis is looked up by message id only; emails without one, or
    /// already analysed, or with a fetch already running, start nothing.
    /// Analysis failures never fail the selection. Returns the background
    /// task when one was started.
    pub fn select_email(&self, email: Email) -> Option<JoinHandle<()>> {
        let selected = self.inbox.select(email);

        let Some(transport_id) = selected.message_id.clone() else {
            debug!(email_id = %selected.id, "No message id, skipping analysis fetch");
            return None;
        };
        if selected.enrichment.is_some() || self.is_disposed() {
            return None;
        }
        if !self.inbox.begin_enrichment(&transport_id) {
            debug!(transport_id, "Analysis fetch already running");
            return None;
        }

        Some(self.enrichment.spawn_fetch(transport_id))
    }

    /// Creates an email, puts it at the front of the list and selects it.
    ///
    /// # Errors
    ///
    /// Returns the backend error; nothing is retried.
    pub async fn create_email(&self, email: &NewEmail) -> Result<Email> {
        let token = self.root.child_token();
        let created = self.backend.create_email(email, &token).await?;
        info!(email_id = %created.id, "Email created");

        self.inbox.prepend(created.clone());
        self.inbox.select(created.clone());
        Ok(created)
    }

    /// Cancels every outstanding request and stops polling.
    ///
    /// Later fetches return [`FetchOutcome::Cancelled`] without touching the
    /// network.
    pub fn dispose(&self) {
        if !self.root.is_cancelled() {
            info!("Disposing email sync controller");
            self.root.cancel();
        }
        self.inbox.set_loading(false);
    }
}

impl Drop for EmailSyncController {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use triagedesk_api::LyzrData;

    fn email(id: &str, day: u32) -> Email {
        let mut e = Email::new(id);
        e.message_id = Some(format!("<{id}@mail>"));
        e.timestamp = Some(Utc.with_ymd_and_hms(2024, 12, day, 9, 0, 0).unwrap());
        e
    }

    fn controller(backend: &Arc<FakeBackend>) -> Arc<EmailSyncController> {
        let config = Config::default();
        Arc::new(EmailSyncController::new(
            backend.clone(),
            Inbox::new(),
            &config,
        ))
    }

    #[tokio::test]
    async fn test_fetch_replaces_sorted() {
        let backend = FakeBackend::new();
        backend.set_emails(vec![email("old", 1), email("new", 9), Email::new("undated")]);
        let controller = controller(&backend);

        let outcome = controller.fetch_emails(false).await.unwrap();
        let ids: Vec<_> = outcome
            .emails()
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, ["new", "old", "undated"]);
        assert_eq!(controller.inbox().emails().len(), 3);
    }

    #[tokio::test]
    async fn test_background_fetch_does_not_toggle_loading() {
        let backend = FakeBackend::new();
        let controller = controller(&backend);
        let mut events = controller.inbox().subscribe();

        controller.fetch_emails(false).await.unwrap();
        let event = events.try_recv().unwrap();
        assert!(matches!(event, crate::InboxEvent::EmailsReplaced { .. }));
        assert!(events.try_recv().is_err());

        controller.refresh_emails().await.unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            crate::InboxEvent::LoadingChanged(true)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            crate::InboxEvent::LoadingChanged(false)
        );
        assert!(!controller.inbox().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_background_fetch_is_skipped() {
        let backend = FakeBackend::new();
        backend.set_list_delay(Duration::from_secs(5));
        let controller = controller(&backend);

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.fetch_emails(false).await }
        });
        tokio::task::yield_now().await;

        let second = controller.fetch_emails(false).await.unwrap();
        assert_eq!(second, FetchOutcome::Skipped);

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, FetchOutcome::Applied(_)));
        assert_eq!(backend.list_calls(), 1);
        assert_eq!(backend.list_max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_supersedes_background_fetch() {
        let backend = FakeBackend::new();
        backend.set_list_delay(Duration::from_secs(5));
        backend.set_emails(vec![email("a", 1)]);
        let controller = controller(&backend);

        let background = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.fetch_emails(false).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(backend.list_in_flight(), 1);

        let started = tokio::time::Instant::now();
        let refreshed = controller.refresh_emails().await.unwrap();

        assert_eq!(background.await.unwrap().unwrap(), FetchOutcome::Superseded);
        assert!(matches!(refreshed, FetchOutcome::Applied(_)));
        // The background request was cut short rather than awaited.
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(backend.list_calls(), 2);
        assert_eq!(backend.list_max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_refresh_applies() {
        let backend = FakeBackend::new();
        backend.set_list_delay(Duration::from_secs(5));
        let controller = controller(&backend);

        let mut handles = Vec::new();
        for _ in 0..3 {
            handles.push(tokio::spawn({
                let controller = Arc::clone(&controller);
                async move { controller.refresh_emails().await }
            }));
            tokio::task::yield_now().await;
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap());
        }
        let applied = outcomes
            .iter()
            .filter(|o| matches!(o, FetchOutcome::Applied(_)))
            .count();
        assert_eq!(applied, 1);
        assert!(matches!(outcomes[2], FetchOutcome::Applied(_)));
        assert_eq!(backend.list_max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_after_three_attempts() {
        let backend = FakeBackend::new();
        backend.fail_list(3, 503);
        let controller = controller(&backend);

        let err = controller.refresh_emails().await.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(backend.list_calls(), 3);
        assert!(controller.inbox().error().is_some());
        assert!(!controller.inbox().is_loading());

        // The next cycle starts from attempt one and clears the error.
        controller.fetch_emails(false).await.unwrap();
        assert_eq!(backend.list_calls(), 4);
        assert!(controller.inbox().error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_keeps_loading_flag() {
        let backend = FakeBackend::new();
        backend.fail_list(2, 500);
        let controller = controller(&backend);

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.refresh_emails().await }
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(controller.inbox().is_loading());
        assert_eq!(backend.list_calls(), 2);

        assert!(matches!(task.await.unwrap().unwrap(), FetchOutcome::Applied(_)));
        assert!(!controller.inbox().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_in_flight() {
        let backend = FakeBackend::new();
        backend.set_list_delay(Duration::from_secs(30));
        let controller = controller(&backend);

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.refresh_emails().await }
        });
        tokio::task::yield_now().await;
        controller.dispose();

        assert_eq!(task.await.unwrap().unwrap(), FetchOutcome::Cancelled);
        assert_eq!(backend.list_in_flight(), 0);
        assert!(!controller.inbox().is_loading());
        assert_eq!(
            controller.fetch_emails(true).await.unwrap(),
            FetchOutcome::Cancelled
        );
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_select_fetches_analysis_by_message_id() {
        let backend = FakeBackend::new();
        backend.set_emails(vec![email("a", 1)]);
        backend.set_enrichment(
            "<a@mail>",
            LyzrData {
                success: true,
                extracted_json: json!({ "classification": "Claim" }),
                ..LyzrData::default()
            },
        );
        let controller = controller(&backend);
        controller.fetch_emails(false).await.unwrap();

        let handle = controller.select_email(email("a", 1)).unwrap();
        assert_eq!(controller.inbox().selected().unwrap().id, "a");
        handle.await.unwrap();

        assert_eq!(backend.enrichment_calls(), ["<a@mail>"]);
        let selected = controller.inbox().selected().unwrap();
        assert_eq!(
            selected.enrichment.unwrap().analysis.classification(),
            Some("Claim")
        );

        // Already analysed: nothing more to fetch.
        assert!(controller.select_email(email("a", 1)).is_none());
        assert_eq!(backend.enrichment_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_select_without_message_id_skips_analysis() {
        let backend = FakeBackend::new();
        let controller = controller(&backend);

        assert!(controller.select_email(Email::new("bare")).is_none());
        assert_eq!(controller.inbox().selected().unwrap().id, "bare");
        assert!(backend.enrichment_calls().is_empty());
        assert!(controller.inbox().error().is_none());
    }

    #[tokio::test]
    async fn test_select_swallows_analysis_failure() {
        let backend = FakeBackend::new();
        backend.fail_enrichment(Some(500));
        let controller = controller(&backend);

        let handle = controller.select_email(email("a", 1)).unwrap();
        handle.await.unwrap();

        assert_eq!(controller.inbox().selected().unwrap().id, "a");
        assert!(controller.inbox().error().is_none());
        assert!(matches!(
            controller.inbox().enrichment_status("<a@mail>"),
            Some(crate::EnrichmentStatus::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_create_prepends_and_selects() {
        let backend = FakeBackend::new();
        backend.set_emails(vec![email("a", 1), email("b", 2)]);
        let controller = controller(&backend);
        controller.fetch_emails(false).await.unwrap();

        let created = controller
            .create_email(&NewEmail {
                subject: "Hello".to_string(),
                sender: "jo@example.com".to_string(),
                recipients: vec!["support@example.com".to_string()],
                ..NewEmail::default()
            })
            .await
            .unwrap();

        let emails = controller.inbox().emails();
        assert_eq!(emails[0].id, created.id);
        assert_eq!(emails.len(), 3);
        assert_eq!(controller.inbox().selected().unwrap().id, created.id);
        assert_eq!(backend.created().len(), 1);
    }
}
