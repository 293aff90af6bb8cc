//! [`Backend`] over the REST API.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use triagedesk_api::{
    ApiClient, AuthStatusResponse, CallbackRequest, CreateFeedbackRequest, FeedbackRecord,
    FeedbackStats, HealthResponse, LoginUrlResponse, LyzrData, NewEmail, Result,
    SaveDraftResponse, SendDraftResponse, Unauthorized, UpdateFeedbackRequest,
};

use super::Backend;
use crate::config::Config;
use crate::model::Email;

/// REST-backed [`Backend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ApiClient::new(&config.api_base_url)?.with_timeout(config.request_timeout);
        Ok(Self::new(client))
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_emails(&self, cancel: &CancellationToken) -> Result<Vec<Email>> {
        let list = self.client.list_emails(cancel).await?;
        let received = list.emails.len();

        let emails: Vec<Email> = list
            .emails
            .into_iter()
            .filter_map(|raw| {
                let email = Email::from_raw(raw);
                if email.is_none() {
                    warn!("Dropping email without _id or message_id");
                }
                email
            })
            .collect();

        debug!(received, kept = emails.len(), "Fetched email list");
        Ok(emails)
    }

    async fn get_email(&self, id: &str, cancel: &CancellationToken) -> Result<Email> {
        Ok(self.client.get_email(id, cancel).await?.into())
    }

    async fn create_email(&self, email: &NewEmail, cancel: &CancellationToken) -> Result<Email> {
        Ok(self.client.create_email(email, cancel).await?.into())
    }

    async fn enrichment(&self, transport_id: &str, cancel: &CancellationToken) -> Result<LyzrData> {
        Ok(self.client.lyzr_data(transport_id, cancel).await?.lyzr_data)
    }

    async fn save_draft(
        &self,
        transport_id: &str,
        markup: &str,
        cancel: &CancellationToken,
    ) -> Result<SaveDraftResponse> {
        self.client.save_draft(transport_id, markup, cancel).await
    }

    async fn send_draft(
        &self,
        transport_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SendDraftResponse> {
        self.client.send_custom_draft(transport_id, cancel).await
    }

    async fn health(&self, cancel: &CancellationToken) -> Result<HealthResponse> {
        self.client.health(cancel).await
    }

    async fn create_feedback(
        &self,
        request: &CreateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord> {
        self.client.create_feedback(request, cancel).await
    }

    async fn feedback_for_email(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackRecord>> {
        self.client.feedback_for_email(email_id, cancel).await
    }

    async fn feedback_stats(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FeedbackStats> {
        self.client.feedback_stats(email_id, cancel).await
    }

    async fn update_feedback(
        &self,
        id: &str,
        request: &UpdateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord> {
        self.client.update_feedback(id, request, cancel).await
    }

    async fn delete_feedback(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        self.client.delete_feedback(id, cancel).await
    }

    async fn auth_login(&self, cancel: &CancellationToken) -> Result<LoginUrlResponse> {
        self.client.salesforce_login(cancel).await
    }

    async fn auth_callback(
        &self,
        code: &str,
        state: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request = CallbackRequest {
            code: code.to_string(),
            state: state.to_string(),
        };
        self.client.salesforce_callback(&request, cancel).await
    }

    async fn auth_logout(&self, cancel: &CancellationToken) -> Result<()> {
        self.client.salesforce_logout(cancel).await
    }

    async fn auth_status(&self, cancel: &CancellationToken) -> Result<AuthStatusResponse> {
        self.client.salesforce_status(cancel).await
    }

    fn subscribe_unauthorized(&self) -> broadcast::Receiver<Unauthorized> {
        self.client.subscribe_unauthorized()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_config() {
        let config = Config::default()
            .with_api_base_url("https://backend.example.com");
        let backend = HttpBackend::from_config(&config).unwrap();
        assert_eq!(backend.client().base_url().as_str(), "https://backend.example.com/");
        assert_eq!(backend.client().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = Config::default().with_api_base_url("nope");
        assert!(HttpBackend::from_config(&config).is_err());
    }
}
