//! Scriptable in-memory backend for unit tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use triagedesk_api::{
    AuthStatusResponse, CreateFeedbackRequest, Error, FeedbackByType, FeedbackRecord,
    FeedbackStats, HealthResponse, LoginUrlResponse, LyzrData, NewEmail, Result,
    SaveDraftResponse, SendDraftResponse, Unauthorized, UpdateFeedbackRequest,
};

use crate::model::Email;
use crate::service::Backend;

#[derive(Default)]
struct State {
    emails: Vec<Email>,
    list_failures: VecDeque<u16>,
    list_delay: Duration,
    created: Vec<NewEmail>,

    enrichment: HashMap<String, LyzrData>,
    enrichment_failure: Option<u16>,
    enrichment_delay: Duration,
    enrichment_calls: Vec<String>,

    saved: Vec<(String, String)>,
    save_failure: Option<u16>,
    send_response: Option<SendDraftResponse>,
    sent: Vec<String>,

    health_failure: Option<u16>,

    feedback: Vec<FeedbackRecord>,

    auth_status: AuthStatusResponse,
    auth_status_failure: Option<u16>,
    login_state: String,
    callbacks: Vec<(String, String)>,
    logout_failure: Option<u16>,
}

/// In-memory [`Backend`] with scripted responses and call counters.
pub struct FakeBackend {
    state: Mutex<State>,
    list_calls: AtomicUsize,
    list_in_flight: AtomicUsize,
    list_max_in_flight: AtomicUsize,
    health_calls: AtomicUsize,
    status_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    unauthorized: broadcast::Sender<Unauthorized>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

fn fail(status: Option<u16>) -> Result<()> {
    status.map_or(Ok(()), |s| Err(Error::status(s, "scripted failure")))
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let (unauthorized, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(State {
                login_state: "state-123".to_string(),
                ..State::default()
            }),
            list_calls: AtomicUsize::new(0),
            list_in_flight: AtomicUsize::new(0),
            list_max_in_flight: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            unauthorized,
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_emails(&self, emails: Vec<Email>) {
        self.state().emails = emails;
    }

    /// The next `times` list calls fail with `status`.
    pub fn fail_list(&self, times: usize, status: u16) {
        self.state().list_failures.extend(std::iter::repeat_n(status, times));
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state().list_delay = delay;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn list_in_flight(&self) -> usize {
        self.list_in_flight.load(Ordering::SeqCst)
    }

    pub fn list_max_in_flight(&self) -> usize {
        self.list_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<NewEmail> {
        self.state().created.clone()
    }

    pub fn set_enrichment(&self, transport_id: &str, data: LyzrData) {
        self.state()
            .enrichment
            .insert(transport_id.to_string(), data);
    }

    pub fn fail_enrichment(&self, status: Option<u16>) {
        self.state().enrichment_failure = status;
    }

    pub fn set_enrichment_delay(&self, delay: Duration) {
        self.state().enrichment_delay = delay;
    }

    pub fn enrichment_calls(&self) -> Vec<String> {
        self.state().enrichment_calls.clone()
    }

    pub fn saved(&self) -> Vec<(String, String)> {
        self.state().saved.clone()
    }

    pub fn fail_save(&self, status: Option<u16>) {
        self.state().save_failure = status;
    }

    pub fn set_send_response(&self, response: SendDraftResponse) {
        self.state().send_response = Some(response);
    }

    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    pub fn fail_health(&self, status: Option<u16>) {
        self.state().health_failure = status;
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn set_auth_status(&self, status: AuthStatusResponse) {
        self.state().auth_status = status;
    }

    pub fn fail_auth_status(&self, status: Option<u16>) {
        self.state().auth_status_failure = status;
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn callbacks(&self) -> Vec<(String, String)> {
        self.state().callbacks.clone()
    }

    pub fn fail_logout(&self, status: Option<u16>) {
        self.state().logout_failure = status;
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn feedback(&self) -> Vec<FeedbackRecord> {
        self.state().feedback.clone()
    }

    /// Publishes a 401 notification as the transport would.
    pub fn emit_unauthorized(&self, path: &str) {
        let _ = self.unauthorized.send(Unauthorized {
            path: path.to_string(),
        });
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_emails(&self, cancel: &CancellationToken) -> Result<Vec<Email>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.list_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.list_max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.list_in_flight);

        let (delay, failure) = {
            let mut state = self.state();
            (state.list_delay, state.list_failures.pop_front())
        };
        pause(delay, cancel).await?;
        fail(failure)?;
        Ok(self.state().emails.clone())
    }

    async fn get_email(&self, id: &str, cancel: &CancellationToken) -> Result<Email> {
        pause(Duration::ZERO, cancel).await?;
        self.state()
            .emails
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| Error::status(404, "not found"))
    }

    async fn create_email(&self, email: &NewEmail, cancel: &CancellationToken) -> Result<Email> {
        pause(Duration::ZERO, cancel).await?;
        let mut state = self.state();
        state.created.push(email.clone());
        let mut created = Email::new(format!("created-{}", state.created.len()));
        created.subject.clone_from(&email.subject);
        created.sender.clone_from(&email.sender);
        created.recipients.clone_from(&email.recipients);
        Ok(created)
    }

    async fn enrichment(&self, transport_id: &str, cancel: &CancellationToken) -> Result<LyzrData> {
        let (delay, failure) = {
            let mut state = self.state();
            state.enrichment_calls.push(transport_id.to_string());
            (state.enrichment_delay, state.enrichment_failure)
        };
        pause(delay, cancel).await?;
        fail(failure)?;
        self.state()
            .enrichment
            .get(transport_id)
            .cloned()
            .ok_or_else(|| Error::status(404, "no analysis"))
    }

    async fn save_draft(
        &self,
        transport_id: &str,
        markup: &str,
        cancel: &CancellationToken,
    ) -> Result<SaveDraftResponse> {
        pause(Duration::ZERO, cancel).await?;
        let mut state = self.state();
        fail(state.save_failure)?;
        state
            .saved
            .push((transport_id.to_string(), markup.to_string()));
        Ok(SaveDraftResponse {
            custom_draft_message: markup.to_string(),
            draft_edited: true,
            draft_edited_at: Some("2024-12-15T12:00:00Z".to_string()),
        })
    }

    async fn send_draft(
        &self,
        transport_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SendDraftResponse> {
        pause(Duration::ZERO, cancel).await?;
        let mut state = self.state();
        state.sent.push(transport_id.to_string());
        Ok(state.send_response.clone().unwrap_or(SendDraftResponse {
            success: true,
            sender_email: Some("support@example.com".to_string()),
            sent_at: Some("2024-12-15T12:05:00Z".to_string()),
            error: None,
        }))
    }

    async fn health(&self, cancel: &CancellationToken) -> Result<HealthResponse> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        pause(Duration::ZERO, cancel).await?;
        fail(self.state().health_failure)?;
        Ok(HealthResponse {
            status: "healthy".to_string(),
            service: "email-api".to_string(),
        })
    }

    async fn create_feedback(
        &self,
        request: &CreateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord> {
        pause(Duration::ZERO, cancel).await?;
        let mut state = self.state();
        let record = FeedbackRecord {
            id: format!("fb-{}", state.feedback.len() + 1),
            email_id: request.email_id.clone(),
            user_id: request.user_id.clone(),
            feedback_type: request.feedback_type,
            rating: request.rating,
            comment: request.comment.clone(),
            created_at: None,
            updated_at: None,
        };
        state.feedback.push(record.clone());
        Ok(record)
    }

    async fn feedback_for_email(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackRecord>> {
        pause(Duration::ZERO, cancel).await?;
        Ok(self
            .state()
            .feedback
            .iter()
            .filter(|f| f.email_id == email_id)
            .cloned()
            .collect())
    }

    async fn feedback_stats(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FeedbackStats> {
        let records = self.feedback_for_email(email_id, cancel).await?;
        let mut by_type = FeedbackByType::default();
        for record in &records {
            match record.feedback_type {
                triagedesk_api::FeedbackType::Positive => by_type.positive += 1,
                triagedesk_api::FeedbackType::Negative => by_type.negative += 1,
                triagedesk_api::FeedbackType::Neutral => by_type.neutral += 1,
                triagedesk_api::FeedbackType::Helpful => by_type.helpful += 1,
                triagedesk_api::FeedbackType::NotHelpful => by_type.not_helpful += 1,
            }
        }
        let ratings: Vec<f64> = records
            .iter()
            .filter_map(|r| r.rating.map(f64::from))
            .collect();
        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / f64::from(u32::try_from(ratings.len()).unwrap())
        };
        Ok(FeedbackStats {
            total_feedback: u32::try_from(records.len()).unwrap(),
            positive_count: by_type.positive,
            negative_count: by_type.negative,
            neutral_count: by_type.neutral,
            helpful_count: by_type.helpful,
            not_helpful_count: by_type.not_helpful,
            average_rating,
            feedback_by_type: by_type,
        })
    }

    async fn update_feedback(
        &self,
        id: &str,
        request: &UpdateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord> {
        pause(Duration::ZERO, cancel).await?;
        let mut state = self.state();
        let record = state
            .feedback
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::status(404, "no feedback"))?;
        if let Some(kind) = request.feedback_type {
            record.feedback_type = kind;
        }
        if request.rating.is_some() {
            record.rating = request.rating;
        }
        if request.comment.is_some() {
            record.comment.clone_from(&request.comment);
        }
        Ok(record.clone())
    }

    async fn delete_feedback(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        pause(Duration::ZERO, cancel).await?;
        let mut state = self.state();
        let before = state.feedback.len();
        state.feedback.retain(|f| f.id != id);
        if state.feedback.len() == before {
            return Err(Error::status(404, "no feedback"));
        }
        Ok(())
    }

    async fn auth_login(&self, cancel: &CancellationToken) -> Result<LoginUrlResponse> {
        pause(Duration::ZERO, cancel).await?;
        let state = self.state().login_state.clone();
        Ok(LoginUrlResponse {
            login_url: format!("https://login.example.com/authorize?state={state}"),
            state,
        })
    }

    async fn auth_callback(
        &self,
        code: &str,
        state: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        pause(Duration::ZERO, cancel).await?;
        self.state()
            .callbacks
            .push((code.to_string(), state.to_string()));
        Ok(())
    }

    async fn auth_logout(&self, cancel: &CancellationToken) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        pause(Duration::ZERO, cancel).await?;
        fail(self.state().logout_failure)
    }

    async fn auth_status(&self, cancel: &CancellationToken) -> Result<AuthStatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        pause(Duration::ZERO, cancel).await?;
        let state = self.state();
        fail(state.auth_status_failure)?;
        Ok(state.auth_status.clone())
    }

    fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.unauthorized.subscribe()
    }
}
