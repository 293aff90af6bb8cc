//! Wire types exchanged with the backend.
//!
//! These mirror the JSON the backend produces. Nearly every field is
//! optional: the backend omits or nulls fields freely, and normalization into
//! domain types happens in the consumer.

mod draft;
mod email;
mod enrichment;
mod feedback;
mod salesforce;

pub use draft::{DraftData, SaveDraftRequest, SaveDraftResponse, SendDraftResponse};
pub use email::{
    EmailList, EmailRecord, NewEmail, RawAddress, RawAttachment, RawBody, RawEmail, RawRecipient,
};
pub use enrichment::{LyzrData, LyzrDataResponse};
pub use feedback::{
    CreateFeedbackRequest, FeedbackByType, FeedbackRecord, FeedbackStats, FeedbackType,
    UpdateFeedbackRequest,
};
pub use salesforce::{
    AuthStatusResponse, CallbackRequest, LoginUrlResponse, SalesforceUser,
};

use serde::{Deserialize, Serialize};

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Reported status (e.g. `healthy`).
    #[serde(default)]
    pub status: String,
    /// Service name.
    #[serde(default)]
    pub service: String,
}
