//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend request failed.
    #[error(transparent)]
    Api(triagedesk_api::Error),

    /// The operation was cancelled (superseded or torn down).
    #[error("Operation cancelled")]
    Cancelled,

    /// A polled request kept failing.
    #[error("Failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        message: String,
    },

    /// OAuth callback state does not match the pending login.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The acknowledgment for this email was already sent.
    #[error("Acknowledgment already sent for email {0}")]
    AlreadySent(String),

    /// A draft with no text was submitted.
    #[error("Draft for email {0} is empty")]
    EmptyDraft(String),

    /// The backend refused to send the draft.
    #[error("Send rejected: {0}")]
    SendRejected(String),

    /// Feedback failed validation.
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<triagedesk_api::Error> for Error {
    fn from(err: triagedesk_api::Error) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Api(err)
        }
    }
}

impl Error {
    /// Returns true if the operation was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the backend answered 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
