//! Reviewer feedback on drafts.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use triagedesk_api::{
    CreateFeedbackRequest, FeedbackRecord, FeedbackStats, FeedbackType, UpdateFeedbackRequest,
};

use crate::error::{Error, Result};
use crate::service::Backend;

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 500;

/// Highest rating.
pub const MAX_RATING: u8 = 5;

/// Feedback as entered by a reviewer, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackInput {
    /// Kind of feedback.
    pub feedback_type: FeedbackType,
    /// Star rating; 0 means unrated.
    pub rating: Option<u8>,
    /// Free text.
    pub comment: Option<String>,
    /// Reviewer.
    pub user_id: Option<String>,
}

impl FeedbackInput {
    /// Feedback of one kind with nothing else set.
    #[must_use]
    pub const fn new(feedback_type: FeedbackType) -> Self {
        Self {
            feedback_type,
            rating: None,
            comment: None,
            user_id: None,
        }
    }

    /// Sets the rating.
    #[must_use]
    pub const fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

fn check_rating(rating: Option<u8>) -> Result<Option<u8>> {
    match rating {
        None | Some(0) => Ok(None),
        Some(r) if r <= MAX_RATING => Ok(Some(r)),
        Some(r) => Err(Error::InvalidFeedback(format!(
            "rating must be between 1 and {MAX_RATING}, got {r}"
        ))),
    }
}

fn check_comment(comment: Option<&str>) -> Result<Option<String>> {
    let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let chars = comment.chars().count();
    if chars > MAX_COMMENT_CHARS {
        return Err(Error::InvalidFeedback(format!(
            "comment is {chars} characters, limit is {MAX_COMMENT_CHARS}"
        )));
    }
    Ok(Some(comment.to_string()))
}

/// Validates `input` into a create request.
///
/// # Errors
///
/// Returns [`Error::InvalidFeedback`] for an empty email id, a rating above
/// 5, or an over-long comment.
pub fn validate(email_id: &str, input: &FeedbackInput) -> Result<CreateFeedbackRequest> {
    if email_id.trim().is_empty() {
        return Err(Error::InvalidFeedback("email id is required".into()));
    }
    Ok(CreateFeedbackRequest {
        email_id: email_id.to_string(),
        user_id: input.user_id.clone(),
        feedback_type: input.feedback_type,
        rating: check_rating(input.rating)?,
        comment: check_comment(input.comment.as_deref())?,
    })
}

/// Renders an average rating; no ratings renders as `N/A`.
#[must_use]
pub fn format_average(average: f64) -> String {
    if average > 0.0 {
        format!("{average:.1}")
    } else {
        "N/A".to_string()
    }
}

/// Feedback operations. User actions, so nothing is retried.
#[derive(Clone)]
pub struct FeedbackService {
    backend: Arc<dyn Backend>,
    cancel: CancellationToken,
}

impl FeedbackService {
    /// Creates the service. Requests run under children of `cancel`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, cancel: CancellationToken) -> Self {
        Self { backend, cancel }
    }

    /// Validates and records feedback for an email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFeedback`] before any request is made, or the
    /// backend error.
    pub async fn submit(&self, email_id: &str, input: &FeedbackInput) -> Result<FeedbackRecord> {
        let request = validate(email_id, input)?;
        let record = self
            .backend
            .create_feedback(&request, &self.cancel.child_token())
            .await?;
        info!(email_id, feedback_id = %record.id, kind = %record.feedback_type, "Feedback recorded");
        Ok(record)
    }

    /// Feedback recorded for an email.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn list_for_email(&self, email_id: &str) -> Result<Vec<FeedbackRecord>> {
        Ok(self
            .backend
            .feedback_for_email(email_id, &self.cancel.child_token())
            .await?)
    }

    /// Aggregated feedback for an email.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn stats_for_email(&self, email_id: &str) -> Result<FeedbackStats> {
        Ok(self
            .backend
            .feedback_stats(email_id, &self.cancel.child_token())
            .await?)
    }

    /// Updates a record. Only the fields set in `input` change; the kind is
    /// always sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFeedback`] or the backend error.
    pub async fn update(&self, id: &str, input: &FeedbackInput) -> Result<FeedbackRecord> {
        let request = UpdateFeedbackRequest {
            feedback_type: Some(input.feedback_type),
            rating: check_rating(input.rating)?,
            comment: check_comment(input.comment.as_deref())?,
        };
        Ok(self
            .backend
            .update_feedback(id, &request, &self.cancel.child_token())
            .await?)
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend
            .delete_feedback(id, &self.cancel.child_token())
            .await?;
        info!(feedback_id = id, "Feedback deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[test]
    fn test_validate_normalizes() {
        let request = validate(
            "e1",
            &FeedbackInput::new(FeedbackType::Helpful)
                .with_rating(0)
                .with_comment("   "),
        )
        .unwrap();
        assert_eq!(request.rating, None);
        assert_eq!(request.comment, None);

        let request = validate(
            "e1",
            &FeedbackInput::new(FeedbackType::Positive)
                .with_rating(5)
                .with_comment("  Spot on \n"),
        )
        .unwrap();
        assert_eq!(request.rating, Some(5));
        assert_eq!(request.comment.as_deref(), Some("Spot on"));
    }

    #[test]
    fn test_validate_rejects() {
        let input = FeedbackInput::new(FeedbackType::Negative).with_rating(6);
        assert!(matches!(
            validate("e1", &input),
            Err(Error::InvalidFeedback(_))
        ));

        let long = FeedbackInput::new(FeedbackType::Negative).with_comment("x".repeat(501));
        assert!(validate("e1", &long).is_err());
        let limit = FeedbackInput::new(FeedbackType::Negative).with_comment("é".repeat(500));
        assert!(validate("e1", &limit).is_ok());

        assert!(validate(" ", &FeedbackInput::new(FeedbackType::Neutral)).is_err());
    }

    #[test]
    fn test_format_average() {
        assert_eq!(format_average(0.0), "N/A");
        assert_eq!(format_average(4.26), "4.3");
        assert_eq!(format_average(3.0), "3.0");
    }

    #[tokio::test]
    async fn test_submit_list_stats_delete() {
        let backend = FakeBackend::new();
        let service = FeedbackService::new(backend.clone(), CancellationToken::new());

        service
            .submit("e1", &FeedbackInput::new(FeedbackType::Helpful).with_rating(4))
            .await
            .unwrap();
        let second = service
            .submit("e1", &FeedbackInput::new(FeedbackType::NotHelpful).with_rating(2))
            .await
            .unwrap();
        service
            .submit("e2", &FeedbackInput::new(FeedbackType::Positive))
            .await
            .unwrap();

        assert_eq!(service.list_for_email("e1").await.unwrap().len(), 2);

        let stats = service.stats_for_email("e1").await.unwrap();
        assert_eq!(stats.total_feedback, 2);
        assert_eq!(stats.feedback_by_type.get(FeedbackType::Helpful), 1);
        assert_eq!(format_average(stats.average_rating), "3.0");

        let updated = service
            .update(&second.id, &FeedbackInput::new(FeedbackType::Helpful))
            .await
            .unwrap();
        assert_eq!(updated.feedback_type, FeedbackType::Helpful);
        assert_eq!(updated.rating, Some(2));

        service.delete(&second.id).await.unwrap();
        assert_eq!(service.list_for_email("e1").await.unwrap().len(), 1);
        assert!(service.delete(&second.id).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_feedback_makes_no_request() {
        let backend = FakeBackend::new();
        let service = FeedbackService::new(backend.clone(), CancellationToken::new());
        let input = FeedbackInput::new(FeedbackType::Helpful).with_rating(9);
        assert!(service.submit("e1", &input).await.is_err());
        assert!(backend.feedback().is_empty());
    }
}
