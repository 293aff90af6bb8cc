//! The backend seam.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use triagedesk_api::{
    AuthStatusResponse, CreateFeedbackRequest, FeedbackRecord, FeedbackStats, HealthResponse,
    LoginUrlResponse, LyzrData, NewEmail, Result, SaveDraftResponse, SendDraftResponse,
    Unauthorized, UpdateFeedbackRequest,
};

use crate::model::Email;

/// Operations the dashboard needs from the backend.
///
/// Every call takes a cancellation token and must stop the underlying
/// request when it fires, returning [`triagedesk_api::Error::Cancelled`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lists every email, normalized.
    async fn list_emails(&self, cancel: &CancellationToken) -> Result<Vec<Email>>;

    /// Fetches one email by primary id.
    async fn get_email(&self, id: &str, cancel: &CancellationToken) -> Result<Email>;

    /// Creates an email.
    async fn create_email(&self, email: &NewEmail, cancel: &CancellationToken) -> Result<Email>;

    /// Fetches the AI analysis for a transport id.
    async fn enrichment(&self, transport_id: &str, cancel: &CancellationToken) -> Result<LyzrData>;

    /// Stores draft markup for a transport id.
    async fn save_draft(
        &self,
        transport_id: &str,
        markup: &str,
        cancel: &CancellationToken,
    ) -> Result<SaveDraftResponse>;

    /// Sends the stored draft for a transport id.
    async fn send_draft(
        &self,
        transport_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SendDraftResponse>;

    /// Checks backend health.
    async fn health(&self, cancel: &CancellationToken) -> Result<HealthResponse>;

    /// Records feedback.
    async fn create_feedback(
        &self,
        request: &CreateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord>;

    /// Lists feedback for an email.
    async fn feedback_for_email(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackRecord>>;

    /// Aggregated feedback for an email.
    async fn feedback_stats(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FeedbackStats>;

    /// Updates a feedback record.
    async fn update_feedback(
        &self,
        id: &str,
        request: &UpdateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord>;

    /// Deletes a feedback record.
    async fn delete_feedback(&self, id: &str, cancel: &CancellationToken) -> Result<()>;

    /// Starts a Salesforce login.
    async fn auth_login(&self, cancel: &CancellationToken) -> Result<LoginUrlResponse>;

    /// Completes a Salesforce login.
    async fn auth_callback(
        &self,
        code: &str,
        state: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Ends the Salesforce session.
    async fn auth_logout(&self, cancel: &CancellationToken) -> Result<()>;

    /// Reports the Salesforce session status.
    async fn auth_status(&self, cancel: &CancellationToken) -> Result<AuthStatusResponse>;

    /// Subscribes to 401 notifications from the transport.
    fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized>;
}
