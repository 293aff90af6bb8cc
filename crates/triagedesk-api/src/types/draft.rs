use serde::{Deserialize, Serialize};

/// Drafting state for one email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftData {
    /// Record id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Email the draft belongs to.
    #[serde(default)]
    pub email_id: String,
    /// Reviewer-edited draft (markup).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_draft_message: Option<String>,
    /// Whether the draft was edited.
    #[serde(default)]
    pub draft_edited: bool,
    /// When the draft was last edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_edited_at: Option<String>,
    /// Whether the acknowledgment email went out.
    #[serde(default)]
    pub acknowledgment_email_sent: bool,
    /// When the acknowledgment went out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgment_email_sent_at: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of the save-draft endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDraftRequest {
    /// Draft markup.
    pub custom_draft_message: String,
}

/// Response of the save-draft endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDraftResponse {
    /// Stored draft.
    #[serde(default)]
    pub custom_draft_message: String,
    /// Edited flag after the save.
    #[serde(default)]
    pub draft_edited: bool,
    /// Edit timestamp.
    #[serde(default)]
    pub draft_edited_at: Option<String>,
}

/// Response of the send-custom-draft endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendDraftResponse {
    /// Whether the backend dispatched the email.
    #[serde(default)]
    pub success: bool,
    /// Mailbox the email was sent from.
    #[serde(default)]
    pub sender_email: Option<String>,
    /// Dispatch time.
    #[serde(default)]
    pub sent_at: Option<String>,
    /// Failure description.
    #[serde(default)]
    pub error: Option<String>,
}
