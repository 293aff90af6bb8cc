//! Typed backend endpoints.

use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::error::Result;
use crate::types::{
    AuthStatusResponse, CallbackRequest, CreateFeedbackRequest, EmailList, EmailRecord,
    FeedbackRecord, FeedbackStats, HealthResponse, LoginUrlResponse, LyzrDataResponse, NewEmail,
    SaveDraftRequest, SaveDraftResponse, SendDraftResponse, UpdateFeedbackRequest,
};

const API: [&str; 2] = ["api", "v1"];

fn path<'a>(rest: &[&'a str]) -> Vec<&'a str> {
    API.iter().copied().chain(rest.iter().copied()).collect()
}

impl ApiClient {
    /// Lists every ingested email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn list_emails(&self, cancel: &CancellationToken) -> Result<EmailList> {
        self.get_json(&path(&["webhook", "emails", "all"]), cancel)
            .await
    }

    /// Fetches one email by primary id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn get_email(&self, id: &str, cancel: &CancellationToken) -> Result<EmailRecord> {
        self.get_json(&path(&["email", id]), cancel).await
    }

    /// Creates an email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn create_email(
        &self,
        email: &NewEmail,
        cancel: &CancellationToken,
    ) -> Result<EmailRecord> {
        self.send_json(Method::POST, &path(&["email"]), Some(email), cancel)
            .await
    }

    /// Fetches the AI analysis for an email by transport id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled. A 404 means the
    /// analysis is not available yet.
    pub async fn lyzr_data(
        &self,
        transport_id: &str,
        cancel: &CancellationToken,
    ) -> Result<LyzrDataResponse> {
        self.get_json(&path(&["webhook", "emails", transport_id, "lyzr-data"]), cancel)
            .await
    }

    /// Checks backend health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn health(&self, cancel: &CancellationToken) -> Result<HealthResponse> {
        self.get_json(&["health"], cancel).await
    }

    /// Stores a reviewer-edited draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn save_draft(
        &self,
        transport_id: &str,
        markup: &str,
        cancel: &CancellationToken,
    ) -> Result<SaveDraftResponse> {
        let body = SaveDraftRequest {
            custom_draft_message: markup.to_string(),
        };
        self.send_json(
            Method::PUT,
            &path(&["webhook", "emails", transport_id, "draft"]),
            Some(&body),
            cancel,
        )
        .await
    }

    /// Sends the stored draft to the customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn send_custom_draft(
        &self,
        transport_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SendDraftResponse> {
        self.send_json(
            Method::POST,
            &path(&["webhook", "emails", transport_id, "send-custom-draft"]),
            None::<&()>,
            cancel,
        )
        .await
    }

    /// Records reviewer feedback.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn create_feedback(
        &self,
        request: &CreateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord> {
        self.send_json(Method::POST, &path(&["feedback"]), Some(request), cancel)
            .await
    }

    /// Lists feedback for one email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn feedback_for_email(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackRecord>> {
        self.get_json(&path(&["feedback", "email", email_id]), cancel)
            .await
    }

    /// Aggregated feedback for one email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn feedback_stats(
        &self,
        email_id: &str,
        cancel: &CancellationToken,
    ) -> Result<FeedbackStats> {
        self.get_json(&path(&["feedback", "email", email_id, "stats"]), cancel)
            .await
    }

    /// Updates a feedback record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn update_feedback(
        &self,
        id: &str,
        request: &UpdateFeedbackRequest,
        cancel: &CancellationToken,
    ) -> Result<FeedbackRecord> {
        self.send_json(Method::PUT, &path(&["feedback", id]), Some(request), cancel)
            .await
    }

    /// Deletes a feedback record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn delete_feedback(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        self.send_unit(Method::DELETE, &path(&["feedback", id]), None::<&()>, cancel)
            .await
    }

    /// Starts a Salesforce login.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn salesforce_login(&self, cancel: &CancellationToken) -> Result<LoginUrlResponse> {
        self.get_json(&path(&["salesforce", "login"]), cancel)
            .await
    }

    /// Completes a Salesforce login with the authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn salesforce_callback(
        &self,
        request: &CallbackRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.send_unit(
            Method::POST,
            &path(&["salesforce", "callback"]),
            Some(request),
            cancel,
        )
        .await
    }

    /// Ends the Salesforce session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn salesforce_logout(&self, cancel: &CancellationToken) -> Result<()> {
        self.send_unit(
            Method::POST,
            &path(&["salesforce", "logout"]),
            None::<&()>,
            cancel,
        )
        .await
    }

    /// Reports the Salesforce session status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is cancelled.
    pub async fn salesforce_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AuthStatusResponse> {
        self.get_json(&path(&["salesforce", "status"]), cancel)
            .await
    }
}
