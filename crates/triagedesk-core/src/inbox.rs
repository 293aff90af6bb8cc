//! Shared in-memory inbox state.
//!
//! Every mutation is a single critical section, so readers never observe a
//! half-applied replace or merge. The lock is never held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::model::{DraftData, Email, Enrichment, EnrichmentStatus, sort_by_timestamp};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notifications for front-ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxEvent {
    /// The list was replaced by a fetch.
    EmailsReplaced {
        /// New list length.
        count: usize,
    },
    /// An email was created and prepended.
    EmailCreated {
        /// Primary id.
        id: String,
    },
    /// The selection changed.
    Selected {
        /// Primary id.
        id: String,
    },
    /// The loading flag changed.
    LoadingChanged(bool),
    /// A list fetch failed after all attempts.
    FetchFailed {
        /// Error text.
        message: String,
    },
    /// Analysis was merged for a transport id.
    EnrichmentMerged {
        /// Transport id.
        transport_id: String,
    },
    /// Analysis could not be fetched.
    EnrichmentFailed {
        /// Transport id.
        transport_id: String,
        /// Error text.
        message: String,
    },
    /// Draft state changed.
    DraftUpdated {
        /// Primary id.
        id: String,
    },
}

#[derive(Debug, Default)]
struct InboxState {
    emails: Vec<Email>,
    selected: Option<Email>,
    loading: bool,
    error: Option<String>,
    enrichment_status: HashMap<String, EnrichmentStatus>,
    local_edits: HashMap<String, String>,
}

/// Shared inbox handle. Clones refer to the same state.
#[derive(Debug, Clone)]
pub struct Inbox {
    state: Arc<Mutex<InboxState>>,
    events: broadcast::Sender<InboxEvent>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(InboxState::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: InboxEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InboxEvent> {
        self.events.subscribe()
    }

    /// Copies the email list.
    #[must_use]
    pub fn emails(&self) -> Vec<Email> {
        self.lock().emails.clone()
    }

    /// Copies the selected email.
    #[must_use]
    pub fn selected(&self) -> Option<Email> {
        self.lock().selected.clone()
    }

    /// Finds an email by primary id or message id.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<Email> {
        self.lock().emails.iter().find(|e| e.matches(key)).cloned()
    }

    /// Whether a user-visible fetch is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Last list error.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Replaces the list with a fresh fetch.
    ///
    /// Ids are unique in the stored list: when a fetch repeats an id, the
    /// last record wins. The list is sorted newest first. Analysis and draft
    /// state already held for an email are kept when the fresh record lacks
    /// them, the selected email is refreshed from the new list, and the list
    /// error is cleared. Returns the stored list.
    pub fn replace_emails(&self, emails: Vec<Email>) -> Vec<Email> {
        let mut emails = dedup_last_wins(emails);
        sort_by_timestamp(&mut emails);

        {
            let mut state = self.lock();
            let mut previous: HashMap<String, Email> = std::mem::take(&mut state.emails)
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect();

            for email in &mut emails {
                if let Some(old) = previous.remove(&email.id) {
                    if email.enrichment.is_none() {
                        email.enrichment = old.enrichment;
                    }
                    if email.draft.is_none() {
                        email.draft = old.draft;
                    }
                }
            }

            if let Some(selected) = state.selected.as_ref()
                && let Some(fresh) = emails.iter().find(|e| e.id == selected.id)
            {
                state.selected = Some(fresh.clone());
            }

            state.emails.clone_from(&emails);
            state.error = None;
        }

        self.emit(InboxEvent::EmailsReplaced {
            count: emails.len(),
        });
        emails
    }

    /// Puts a newly created email at the front of the list.
    pub fn prepend(&self, email: Email) {
        let id = email.id.clone();
        {
            let mut state = self.lock();
            state.emails.retain(|e| e.id != id);
            state.emails.insert(0, email);
        }
        self.emit(InboxEvent::EmailCreated { id });
    }

    /// Selects an email.
    ///
    /// The list copy is preferred when it exists, since it may already carry
    /// merged analysis. Returns the selected email.
    pub fn select(&self, email: Email) -> Email {
        let selected = {
            let mut state = self.lock();
            let current = state
                .emails
                .iter()
                .find(|e| e.id == email.id)
                .cloned()
                .unwrap_or(email);
            state.selected = Some(current.clone());
            current
        };
        self.emit(InboxEvent::Selected {
            id: selected.id.clone(),
        });
        selected
    }

    /// Merges analysis into every email matching `transport_id` (by message
    /// id or primary id), in the list and in the selection.
    ///
    /// Only the analysis field is written. Returns the number of list entries
    /// updated.
    pub fn merge_enrichment(&self, transport_id: &str, enrichment: &Enrichment) -> usize {
        let matched = {
            let mut state = self.lock();
            let mut matched = 0;
            for email in state.emails.iter_mut().filter(|e| e.matches(transport_id)) {
                email.enrichment = Some(enrichment.clone());
                matched += 1;
            }
            if let Some(selected) = state.selected.as_mut()
                && selected.matches(transport_id)
            {
                selected.enrichment = Some(enrichment.clone());
            }
            state.enrichment_status.remove(transport_id);
            matched
        };

        self.emit(InboxEvent::EnrichmentMerged {
            transport_id: transport_id.to_string(),
        });
        matched
    }

    /// Applies `update` to the draft state of the email with primary id
    /// `id`, creating it if absent, in the list and in the selection.
    ///
    /// Returns false if no such email is held.
    pub fn update_draft<F>(&self, id: &str, update: F) -> bool
    where
        F: Fn(&mut DraftData),
    {
        let found = {
            let mut state = self.lock();
            let mut found = false;

            if let Some(email) = state.emails.iter_mut().find(|e| e.id == id) {
                let transport_id = email.transport_id().to_string();
                update(email.draft.get_or_insert_with(|| new_draft(transport_id)));
                found = true;
            }
            if let Some(selected) = state.selected.as_mut()
                && selected.id == id
            {
                let transport_id = selected.transport_id().to_string();
                update(selected.draft.get_or_insert_with(|| new_draft(transport_id)));
                found = true;
            }
            found
        };

        if found {
            self.emit(InboxEvent::DraftUpdated { id: id.to_string() });
        }
        found
    }

    /// Sets the loading flag.
    pub fn set_loading(&self, loading: bool) {
        let changed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.loading, loading) != loading
        };
        if changed {
            self.emit(InboxEvent::LoadingChanged(loading));
        }
    }

    /// Records a terminal list-fetch error.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.lock().error = Some(message.clone());
        self.emit(InboxEvent::FetchFailed { message });
    }

    /// Enrichment status for a transport id.
    #[must_use]
    pub fn enrichment_status(&self, transport_id: &str) -> Option<EnrichmentStatus> {
        self.lock().enrichment_status.get(transport_id).cloned()
    }

    /// Sets the enrichment status for a transport id.
    pub fn set_enrichment_status(&self, transport_id: &str, status: EnrichmentStatus) {
        let failure = match &status {
            EnrichmentStatus::Failed(message) => Some(message.clone()),
            _ => None,
        };
        self.lock()
            .enrichment_status
            .insert(transport_id.to_string(), status);

        if let Some(message) = failure {
            self.emit(InboxEvent::EnrichmentFailed {
                transport_id: transport_id.to_string(),
                message,
            });
        }
    }

    /// Marks an enrichment fetch as loading unless one already is.
    ///
    /// Returns false when a fetch for `transport_id` is already in flight.
    pub fn begin_enrichment(&self, transport_id: &str) -> bool {
        let mut state = self.lock();
        if state.enrichment_status.get(transport_id) == Some(&EnrichmentStatus::Loading) {
            return false;
        }
        state
            .enrichment_status
            .insert(transport_id.to_string(), EnrichmentStatus::Loading);
        true
    }

    /// Clears the enrichment status for a transport id.
    pub fn clear_enrichment_status(&self, transport_id: &str) {
        self.lock().enrichment_status.remove(transport_id);
    }

    /// Unsaved edit for an email.
    #[must_use]
    pub fn local_edit(&self, id: &str) -> Option<String> {
        self.lock().local_edits.get(id).cloned()
    }

    /// Stores an unsaved edit. Polls never overwrite it.
    pub fn set_local_edit(&self, id: &str, text: impl Into<String>) {
        self.lock().local_edits.insert(id.to_string(), text.into());
    }

    /// Drops the unsaved edit for an email.
    pub fn clear_local_edit(&self, id: &str) {
        self.lock().local_edits.remove(id);
    }
}

fn dedup_last_wins(emails: Vec<Email>) -> Vec<Email> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Email> = emails
        .into_iter()
        .rev()
        .filter(|e| seen.insert(e.id.clone()))
        .collect();
    unique.reverse();
    unique
}

fn new_draft(email_id: String) -> DraftData {
    DraftData {
        email_id,
        ..DraftData::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Analysis;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn email(id: &str, day: Option<u32>) -> Email {
        let mut e = Email::new(id);
        e.message_id = Some(format!("<{id}@mail>"));
        e.timestamp = day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap());
        e
    }

    fn enrichment(label: &str) -> Enrichment {
        Enrichment {
            response_id: Some(label.to_string()),
            success: true,
            error: None,
            processed_at: None,
            analysis: Analysis::from_json(&serde_json::json!({ "classification": label })),
        }
    }

    #[test]
    fn test_replace_sorts_and_clears_error() {
        let inbox = Inbox::new();
        inbox.set_error("boom");

        let stored = inbox.replace_emails(vec![email("a", Some(1)), email("b", None), email("c", Some(5))]);

        let ids: Vec<&str> = stored.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(inbox.error().is_none());
    }

    #[test]
    fn test_replace_keeps_cached_enrichment_and_drafts() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", Some(1))]);
        inbox.merge_enrichment("<a@mail>", &enrichment("Claim"));
        inbox.update_draft("a", |d| d.custom_draft_message = Some("saved".into()));

        inbox.replace_emails(vec![email("a", Some(1)), email("b", Some(2))]);

        let a = inbox.find("a").unwrap();
        assert_eq!(a.enrichment.unwrap().analysis.classification(), Some("Claim"));
        assert_eq!(a.draft.unwrap().custom_draft_message.as_deref(), Some("saved"));
        assert!(inbox.find("b").unwrap().enrichment.is_none());
    }

    #[test]
    fn test_replace_prefers_fresh_server_draft() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", None)]);
        inbox.update_draft("a", |d| d.custom_draft_message = Some("old".into()));

        let mut fresh = email("a", None);
        fresh.draft = Some(DraftData {
            custom_draft_message: Some("server".into()),
            ..DraftData::default()
        });
        inbox.replace_emails(vec![fresh]);

        assert_eq!(
            inbox.find("a").unwrap().draft.unwrap().custom_draft_message.as_deref(),
            Some("server")
        );
    }

    #[test]
    fn test_replace_keeps_last_duplicate() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("x", Some(1))]);
        inbox.merge_enrichment("x", &enrichment("Claim"));

        let mut first = email("x", Some(1));
        first.subject = "first".into();
        let mut second = email("x", Some(2));
        second.subject = "second".into();
        let stored = inbox.replace_emails(vec![first, email("y", Some(3)), second]);

        let ids: Vec<&str> = stored.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x"]);
        let x = inbox.find("x").unwrap();
        assert_eq!(x.subject, "second");
        assert_eq!(x.enrichment.unwrap().analysis.classification(), Some("Claim"));
        assert_eq!(inbox.merge_enrichment("x", &enrichment("Again")), 1);
    }

    #[test]
    fn test_replace_refreshes_selection() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", None)]);
        inbox.select(email("a", None));

        let mut updated = email("a", None);
        updated.subject = "Updated".into();
        inbox.replace_emails(vec![updated]);

        assert_eq!(inbox.selected().unwrap().subject, "Updated");
    }

    #[test]
    fn test_selection_survives_removal_from_list() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", None)]);
        inbox.select(email("a", None));
        inbox.replace_emails(vec![email("b", None)]);
        assert_eq!(inbox.selected().unwrap().id, "a");
    }

    #[test]
    fn test_merge_by_either_identifier() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", None), email("b", None)]);
        inbox.select(email("a", None));

        assert_eq!(inbox.merge_enrichment("a", &enrichment("by-id")), 1);
        assert_eq!(inbox.merge_enrichment("<b@mail>", &enrichment("by-mid")), 1);
        assert_eq!(inbox.merge_enrichment("<zzz@mail>", &enrichment("none")), 0);

        assert_eq!(
            inbox.selected().unwrap().enrichment.unwrap().response_id.as_deref(),
            Some("by-id")
        );
        assert_eq!(
            inbox.find("b").unwrap().enrichment.unwrap().response_id.as_deref(),
            Some("by-mid")
        );
    }

    #[test]
    fn test_merge_leaves_selection_for_other_email() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", None), email("b", None)]);
        inbox.select(email("b", None));

        inbox.merge_enrichment("<a@mail>", &enrichment("A"));

        assert!(inbox.selected().unwrap().enrichment.is_none());
        assert!(inbox.find("a").unwrap().enrichment.is_some());
    }

    #[test]
    fn test_prepend_goes_first_without_resort() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("new", Some(9)), email("old", Some(1))]);
        inbox.prepend(email("created", None));
        let ids: Vec<String> = inbox.emails().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["created", "new", "old"]);
    }

    #[test]
    fn test_begin_enrichment_dedupes() {
        let inbox = Inbox::new();
        assert!(inbox.begin_enrichment("<a@mail>"));
        assert!(!inbox.begin_enrichment("<a@mail>"));
        inbox.set_enrichment_status("<a@mail>", EnrichmentStatus::Failed("x".into()));
        assert!(inbox.begin_enrichment("<a@mail>"));
    }

    #[test]
    fn test_local_edits_survive_polls() {
        let inbox = Inbox::new();
        inbox.replace_emails(vec![email("a", None)]);
        inbox.set_local_edit("a", "half-written reply");
        inbox.replace_emails(vec![email("a", None)]);
        assert_eq!(inbox.local_edit("a").as_deref(), Some("half-written reply"));
    }

    #[test]
    fn test_events_are_broadcast() {
        let inbox = Inbox::new();
        let mut events = inbox.subscribe();

        inbox.set_loading(true);
        inbox.set_loading(true);
        inbox.replace_emails(vec![email("a", None)]);

        assert_eq!(events.try_recv().unwrap(), InboxEvent::LoadingChanged(true));
        assert_eq!(events.try_recv().unwrap(), InboxEvent::EmailsReplaced { count: 1 });
        assert!(events.try_recv().is_err());
    }

    proptest! {
        #[test]
        fn prop_merge_is_isolated_and_idempotent(
            count in 1usize..8,
            target in 0usize..8,
            label in "[a-z]{1,8}",
        ) {
            let target = target % count;
            let inbox = Inbox::new();
            inbox.replace_emails((0..count).map(|i| email(&i.to_string(), Some(1))).collect());
            let before = inbox.emails();

            let key = format!("<{target}@mail>");
            inbox.merge_enrichment(&key, &enrichment(&label));
            let once = inbox.emails();
            inbox.merge_enrichment(&key, &enrichment(&label));
            let twice = inbox.emails();

            prop_assert_eq!(&once, &twice);
            for (old, new) in before.iter().zip(&once) {
                if new.id == target.to_string() {
                    let mut expected = old.clone();
                    expected.enrichment = Some(enrichment(&label));
                    prop_assert_eq!(new, &expected);
                } else {
                    prop_assert_eq!(new, old);
                }
            }
        }
    }
}
