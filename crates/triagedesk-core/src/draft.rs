//! Draft content resolution and the edit/save/send lifecycle.
//!
//! Drafts are edited as plain text and stored as markup. The effective
//! content of an email is, in order: the draft saved on the server, the
//! reviewer's unsaved local edit, text generated from the analysis, and a
//! generic acknowledgment.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use triagedesk_api::SendDraftResponse;
use triagedesk_markup::{to_editable, to_markup};

use crate::error::{Error, Result};
use crate::inbox::Inbox;
use crate::model::{DraftData, DraftStatus, Email, Enrichment, display_or};
use crate::service::Backend;

const SIGN_OFF: &str = "Best regards,\nSupport Team";
const DEFAULT_RESPONSE_TIME: &str = "24 hours";
const DEFAULT_NEXT_STEPS: &str = "We are processing your request and will contact you soon.";
const GENERIC_DRAFT: &str = "Thank you for your email. We have received your message and are \
     processing it.\n\nOur team will review your request and get back to you shortly.\n\n\
     Best regards,\nSupport Team";

/// Resolves the plain text to show for `email`.
///
/// `local_edit` is the reviewer's unsaved text, if any. Blank candidates are
/// skipped.
#[must_use]
pub fn effective_content(email: &Email, local_edit: Option<&str>) -> String {
    if let Some(saved) = email
        .draft
        .as_ref()
        .and_then(|d| d.custom_draft_message.as_deref())
        .filter(|m| !m.trim().is_empty())
    {
        return to_editable(saved);
    }

    if let Some(edit) = local_edit.filter(|e| !e.trim().is_empty()) {
        return edit.to_string();
    }

    synthesize(email.enrichment.as_ref())
}

/// Generates a draft from the analysis' customer response fields.
///
/// Every field is optional. Without a customer response the generic
/// acknowledgment is returned.
#[must_use]
pub fn synthesize(enrichment: Option<&Enrichment>) -> String {
    let Some(response) = enrichment.and_then(|e| e.analysis.customer_response()) else {
        return GENERIC_DRAFT.to_string();
    };

    let mut paragraphs = Vec::with_capacity(4);

    // Template ids are single tokens; anything with a space is prose.
    match response
        .auto_acknowledgment
        .as_deref()
        .map(str::trim)
        .filter(|a| a.contains(' '))
    {
        Some(prose) => paragraphs.push(prose.to_string()),
        None => paragraphs.push(format!(
            "Thank you for your email. We have received your message and our team will \
             review your request and get back to you in the next {}.",
            display_or(
                response.estimated_response_time.as_deref(),
                DEFAULT_RESPONSE_TIME
            )
            .trim()
        )),
    }

    paragraphs.push(
        display_or(response.next_steps.as_deref(), DEFAULT_NEXT_STEPS)
            .trim()
            .to_string(),
    );

    if let Some(reference) = response
        .case_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
    {
        paragraphs.push(format!("Reference: {reference}"));
    }

    paragraphs.push(SIGN_OFF.to_string());
    paragraphs.join("\n\n")
}

/// Manages drafting for emails held in an [`Inbox`].
///
/// Emails are addressed by primary id or message id. Nothing here retries;
/// failures go straight back to the caller and leave the local edit intact.
#[derive(Clone)]
pub struct DraftReconciler {
    backend: Arc<dyn Backend>,
    inbox: Inbox,
    cancel: CancellationToken,
}

impl DraftReconciler {
    /// Creates a reconciler. Requests run under children of `cancel`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, inbox: Inbox, cancel: CancellationToken) -> Self {
        Self {
            backend,
            inbox,
            cancel,
        }
    }

    fn resolve(&self, key: &str) -> Result<Email> {
        self.inbox
            .find(key)
            .or_else(|| self.inbox.selected().filter(|e| e.matches(key)))
            .ok_or_else(|| Error::NotFound(format!("email {key}")))
    }

    fn ensure_editable(email: &Email) -> Result<()> {
        if DraftStatus::of(email).can_edit() {
            Ok(())
        } else {
            Err(Error::AlreadySent(email.id.clone()))
        }
    }

    /// Effective plain-text content for the email, including any unsaved
    /// local edit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the email is not held.
    pub fn content(&self, key: &str) -> Result<String> {
        let email = self.resolve(key)?;
        let edit = self.inbox.local_edit(&email.id);
        Ok(effective_content(&email, edit.as_deref()))
    }

    /// Markup that would be sent for the email right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the email is not held.
    pub fn preview(&self, key: &str) -> Result<String> {
        self.content(key).map(|text| to_markup(&text))
    }

    /// Stores an unsaved edit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySent`] once the acknowledgment went out, or
    /// [`Error::NotFound`] if the email is not held.
    pub fn edit(&self, key: &str, text: impl Into<String>) -> Result<()> {
        let email = self.resolve(key)?;
        Self::ensure_editable(&email)?;
        self.inbox.set_local_edit(&email.id, text);
        Ok(())
    }

    /// Drops the unsaved edit, if any.
    pub fn discard_edit(&self, key: &str) {
        if let Ok(email) = self.resolve(key) {
            self.inbox.clear_local_edit(&email.id);
        }
    }

    /// Saves `content` as the email's draft.
    ///
    /// The text is rendered to markup, stored on the server and mirrored into
    /// the local draft state. The sent flag is left untouched. The local
    /// edit is cleared only on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySent`], [`Error::EmptyDraft`],
    /// [`Error::NotFound`], or the backend error.
    pub async fn save_draft(&self, key: &str, content: &str) -> Result<DraftData> {
        let email = self.resolve(key)?;
        Self::ensure_editable(&email)?;
        self.store(&email, content).await
    }

    async fn store(&self, email: &Email, content: &str) -> Result<DraftData> {
        let text = to_editable(content);
        if text.trim().is_empty() {
            return Err(Error::EmptyDraft(email.id.clone()));
        }

        let transport_id = email.transport_id();
        let token = self.cancel.child_token();
        let saved = self
            .backend
            .save_draft(transport_id, &to_markup(&text), &token)
            .await?;

        self.inbox.update_draft(&email.id, |draft| {
            draft.custom_draft_message = Some(saved.custom_draft_message.clone());
            draft.draft_edited = saved.draft_edited;
            draft.draft_edited_at.clone_from(&saved.draft_edited_at);
        });
        self.inbox.clear_local_edit(&email.id);
        info!(email_id = %email.id, transport_id, "Draft saved");

        Ok(self.draft_of(email))
    }

    fn draft_of(&self, email: &Email) -> DraftData {
        self.resolve(&email.id)
            .ok()
            .and_then(|e| e.draft)
            .unwrap_or_default()
    }

    /// Saves `content` and sends it to the customer.
    ///
    /// Callers must not send twice; this is enforced here from the local
    /// sent flag, and again by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySent`] if already sent, [`Error::SendRejected`]
    /// when the backend reports failure, or any save error.
    pub async fn send_draft(&self, key: &str, content: &str) -> Result<SendDraftResponse> {
        let email = self.resolve(key)?;
        Self::ensure_editable(&email)?;
        self.store(&email, content).await?;

        let transport_id = email.transport_id();
        let token = self.cancel.child_token();
        let response = self.backend.send_draft(transport_id, &token).await?;

        if !response.success {
            let reason = response
                .error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Failed to send custom draft".to_string());
            warn!(email_id = %email.id, reason, "Send rejected");
            return Err(Error::SendRejected(reason));
        }

        self.inbox.update_draft(&email.id, |draft| {
            draft.acknowledgment_email_sent = true;
            draft.acknowledgment_email_sent_at.clone_from(&response.sent_at);
        });
        info!(
            email_id = %email.id,
            recipient = response.sender_email.as_deref().unwrap_or("unknown"),
            "Acknowledgment sent"
        );
        Ok(response)
    }
}
