//! Per-email status derived or tracked alongside the polled records.

use super::Email;

/// Progress of an enrichment fetch.
///
/// There is no ready state: a fetched analysis lives on the email itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentStatus {
    /// Fetch in flight.
    Loading,
    /// The backend has no analysis for this email yet.
    Unavailable,
    /// The fetch failed.
    Failed(String),
}

/// Drafting state of an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    /// No analysis yet, so nothing was generated.
    NoDraft,
    /// Generated from the analysis, untouched.
    Generated,
    /// Edited and saved by a reviewer.
    Edited,
    /// Acknowledgment sent; terminal.
    Sent,
}

impl DraftStatus {
    /// Derives the status of `email`.
    #[must_use]
    pub fn of(email: &Email) -> Self {
        match &email.draft {
            Some(d) if d.acknowledgment_email_sent => Self::Sent,
            Some(d)
                if d.draft_edited
                    && d.custom_draft_message
                        .as_deref()
                        .is_some_and(|m| !m.trim().is_empty()) =>
            {
                Self::Edited
            }
            _ if email.enrichment.is_some() => Self::Generated,
            _ => Self::NoDraft,
        }
    }

    /// Whether the draft may still be edited.
    #[must_use]
    pub const fn can_edit(self) -> bool {
        !matches!(self, Self::Sent)
    }

    /// Whether the draft may be sent.
    #[must_use]
    pub const fn can_send(self) -> bool {
        !matches!(self, Self::Sent)
    }

    /// Short label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoDraft => "No draft",
            Self::Generated => "Generated",
            Self::Edited => "Edited",
            Self::Sent => "Sent",
        }
    }
}
