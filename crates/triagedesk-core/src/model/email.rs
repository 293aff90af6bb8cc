//! Email model and normalization from wire records.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use triagedesk_api::{DraftData, EmailRecord, RawAttachment, RawEmail, RawRecipient};

use super::Enrichment;

const NO_SUBJECT: &str = "No Subject";
const UNKNOWN_SENDER: &str = "Unknown Sender";
const UNKNOWN_RECIPIENT: &str = "Unknown Recipient";

/// Attachment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment id.
    pub id: String,
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
}

impl From<RawAttachment> for Attachment {
    fn from(raw: RawAttachment) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            size: raw.size,
            mime_type: raw.mime_type,
        }
    }
}

/// An inbound email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Storage primary key; unique within a list.
    pub id: String,
    /// Transport-level message id.
    pub message_id: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Sender address.
    pub sender: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Body; may contain markup.
    pub body: String,
    /// Receive time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Attachments.
    pub attachments: Vec<Attachment>,
    /// Read flag.
    pub is_read: bool,
    /// AI analysis, once fetched.
    pub enrichment: Option<Enrichment>,
    /// Drafting state.
    pub draft: Option<DraftData>,
}

impl Email {
    /// Creates an email with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_id: None,
            subject: NO_SUBJECT.to_string(),
            sender: UNKNOWN_SENDER.to_string(),
            recipients: Vec::new(),
            body: String::new(),
            timestamp: None,
            attachments: Vec::new(),
            is_read: false,
            enrichment: None,
            draft: None,
        }
    }

    /// Normalizes a record from the list endpoint.
    ///
    /// Returns `None` when the record carries neither `_id` nor `message_id`.
    #[must_use]
    pub fn from_raw(raw: RawEmail) -> Option<Self> {
        let id = non_empty(raw.id).or_else(|| non_empty(raw.message_id.clone()))?;

        let sender = raw
            .from
            .and_then(address_of)
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let recipients = raw
            .to
            .unwrap_or_default()
            .into_iter()
            .map(|r| address_of(r).unwrap_or_else(|| UNKNOWN_RECIPIENT.to_string()))
            .collect();
        let timestamp = raw
            .received_date
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| raw.extracted_at.as_deref().and_then(parse_timestamp));

        Some(Self {
            id,
            message_id: non_empty(raw.message_id),
            subject: non_empty(raw.subject).unwrap_or_else(|| NO_SUBJECT.to_string()),
            sender,
            recipients,
            body: raw.body.and_then(|b| b.content).unwrap_or_default(),
            timestamp,
            attachments: raw
                .attachments
                .unwrap_or_default()
                .into_iter()
                .map(Attachment::from)
                .collect(),
            is_read: raw.is_read.unwrap_or(false),
            enrichment: raw.lyzr_data.map(Enrichment::from),
            draft: raw.draft_data,
        })
    }

    /// Identifier used for enrichment and draft endpoints: the message id
    /// when present, else the primary id.
    #[must_use]
    pub fn transport_id(&self) -> &str {
        self.message_id.as_deref().unwrap_or(&self.id)
    }

    /// Returns true if `key` is this email's message id or primary id.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.message_id.as_deref() == Some(key)
    }

    /// Returns true once the acknowledgment went out.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.draft
            .as_ref()
            .is_some_and(|d| d.acknowledgment_email_sent)
    }
}

impl From<EmailRecord> for Email {
    fn from(record: EmailRecord) -> Self {
        Self {
            id: record.id,
            message_id: non_empty(record.message_id),
            subject: if record.subject.is_empty() {
                NO_SUBJECT.to_string()
            } else {
                record.subject
            },
            sender: if record.sender.is_empty() {
                UNKNOWN_SENDER.to_string()
            } else {
                record.sender
            },
            recipients: record.recipients,
            body: record.body.unwrap_or_default(),
            timestamp: record.timestamp.as_deref().and_then(parse_timestamp),
            attachments: record.attachments.into_iter().map(Attachment::from).collect(),
            is_read: record.is_read.unwrap_or(false),
            enrichment: record.lyzr_data.map(Enrichment::from),
            draft: record.draft_data,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn address_of(recipient: RawRecipient) -> Option<String> {
    non_empty(recipient.email_address?.address)
}

/// Parses an ISO 8601 timestamp.
///
/// Accepts RFC 3339 and offset-less `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as
/// UTC). Anything else is treated as absent.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Sorts newest first; emails without a timestamp go last.
///
/// The sort is stable, so equal keys keep their relative order.
pub fn sort_by_timestamp(emails: &mut [Email]) {
    emails.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
