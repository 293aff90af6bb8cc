use serde::{Deserialize, Serialize};

use super::{DraftData, LyzrData};

/// Response of the list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailList {
    /// Emails in backend order.
    #[serde(default)]
    pub emails: Vec<RawEmail>,
    /// Count reported by the backend.
    #[serde(default)]
    pub count: usize,
}

/// An email as stored by the webhook ingester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmail {
    /// Storage primary key.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Transport-level message id.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,
    /// Sender.
    #[serde(default)]
    pub from: Option<RawRecipient>,
    /// Recipients.
    #[serde(default)]
    pub to: Option<Vec<RawRecipient>>,
    /// Body.
    #[serde(default)]
    pub body: Option<RawBody>,
    /// When the mail server received the message.
    #[serde(default)]
    pub received_date: Option<String>,
    /// When the ingester extracted the message.
    #[serde(default)]
    pub extracted_at: Option<String>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Option<Vec<RawAttachment>>,
    /// Read flag.
    #[serde(default)]
    pub is_read: Option<bool>,
    /// Embedded enrichment, when the backend joins it in.
    #[serde(default)]
    pub lyzr_data: Option<LyzrData>,
    /// Embedded draft state, when the backend joins it in.
    #[serde(default)]
    pub draft_data: Option<DraftData>,
}

/// A `{ "emailAddress": { ... } }` wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecipient {
    /// The wrapped address.
    #[serde(rename = "emailAddress", default)]
    pub email_address: Option<RawAddress>,
}

/// A mailbox address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAddress {
    /// Address (`user@example.com`).
    #[serde(default)]
    pub address: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Message body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBody {
    /// Body content; may be markup.
    #[serde(default)]
    pub content: Option<String>,
    /// Content type (`html`, `text`).
    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,
}

/// Attachment metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttachment {
    /// Attachment id.
    #[serde(default)]
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// MIME type.
    #[serde(rename = "type", default)]
    pub mime_type: String,
    /// Download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An email in the dashboard shape, as returned by the single-email and
/// create endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Storage primary key.
    pub id: String,
    /// Transport-level message id.
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Sender address.
    #[serde(default)]
    pub sender: String,
    /// Recipient addresses.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// ISO 8601 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
    /// Read flag.
    #[serde(default)]
    pub is_read: Option<bool>,
    /// Embedded enrichment.
    #[serde(rename = "lyzrData", default, skip_serializing_if = "Option::is_none")]
    pub lyzr_data: Option<LyzrData>,
    /// Embedded draft state.
    #[serde(rename = "draftData", default, skip_serializing_if = "Option::is_none")]
    pub draft_data: Option<DraftData>,
}

/// Body of `POST /api/v1/email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmail {
    /// Subject line.
    pub subject: String,
    /// Sender address.
    pub sender: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// ISO 8601 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Attachments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<RawAttachment>,
    /// Read flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}
