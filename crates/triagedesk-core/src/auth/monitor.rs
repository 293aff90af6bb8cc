//! Session lifecycle: login, status checks, expiry and 401 handling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use triagedesk_api::LoginUrlResponse;

use super::session::AuthSession;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::service::Backend;

const EVENT_CHANNEL_CAPACITY: usize = 16;
const EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Session notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A status check changed the session.
    StatusChanged(AuthSession),
    /// The session ran out and was logged out.
    Expired,
    /// A 401 was observed and the session is no longer valid.
    Invalidated,
    /// The user logged out.
    LoggedOut,
}

#[derive(Debug, Default)]
struct State {
    session: AuthSession,
    pending_state: Option<String>,
}

/// Owns the Salesforce session and keeps it current.
///
/// Dependents receive a reference (or an `Arc`) to the monitor; there is no
/// global session.
pub struct AuthSessionMonitor {
    backend: Arc<dyn Backend>,
    state: Mutex<State>,
    events: broadcast::Sender<AuthEvent>,
    status_interval: Duration,
    cancel: CancellationToken,
}

impl AuthSessionMonitor {
    /// Creates a monitor with an unauthenticated session.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend,
            state: Mutex::new(State::default()),
            events,
            status_interval: config.auth_status_interval,
            cancel: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Subscribes to session notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Current session.
    #[must_use]
    pub fn session(&self) -> AuthSession {
        self.lock().session.clone()
    }

    /// Whether the session is usable right now.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_valid_at(Utc::now())
    }

    /// State of the login awaiting its callback.
    #[must_use]
    pub fn pending_state(&self) -> Option<String> {
        self.lock().pending_state.clone()
    }

    /// Restores a pending login state kept across restarts.
    pub fn restore_pending_state(&self, state: impl Into<String>) {
        self.lock().pending_state = Some(state.into());
    }

    fn replace_session(&self, session: AuthSession) -> bool {
        let mut state = self.lock();
        let changed = state.session != session;
        state.session = session;
        changed
    }

    /// Starts a login and records its state for the callback.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn login(&self) -> Result<LoginUrlResponse> {
        let token = self.cancel.child_token();
        let response = self.backend.auth_login(&token).await?;
        self.lock().pending_state = Some(response.state.clone());
        info!("Salesforce login started");
        Ok(response)
    }

    /// Completes a login with the authorization code and re-checks status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateMismatch`] without contacting the backend when
    /// `state` is not the pending one, or the backend error.
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<AuthSession> {
        if self.pending_state().as_deref() != Some(state) {
            warn!("OAuth callback state does not match the pending login");
            return Err(Error::StateMismatch);
        }

        let token = self.cancel.child_token();
        self.backend.auth_callback(code, state, &token).await?;
        self.lock().pending_state = None;
        info!("Salesforce login completed");

        self.refresh_status().await
    }

    /// Ends the session. The local session is cleared even when the backend
    /// call fails.
    ///
    /// # Errors
    ///
    /// Returns the backend error, after clearing.
    pub async fn logout(&self) -> Result<()> {
        let token = self.cancel.child_token();
        let result = self.backend.auth_logout(&token).await;

        self.replace_session(AuthSession::default());
        self.emit(AuthEvent::LoggedOut);

        match result {
            Ok(()) => {
                info!("Salesforce session closed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Logout request failed; session cleared locally");
                Err(err.into())
            }
        }
    }

    /// Asks the backend for the session status.
    ///
    /// A failed check leaves the session unauthenticated. When an
    /// authenticated session comes back with its expiry already passed,
    /// [`AuthEvent::Expired`] follows the status change.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn refresh_status(&self) -> Result<AuthSession> {
        let token = self.cancel.child_token();
        let mut expired = false;
        let (session, result) = match self.backend.auth_status(&token).await {
            Ok(status) => {
                let reported = status.is_authenticated;
                let session = AuthSession::from_status(status, Utc::now());
                expired = reported && !session.is_authenticated;
                (session.clone(), Ok(session))
            }
            Err(err) if err.is_cancelled() => return Err(Error::Cancelled),
            Err(err) => {
                warn!(error = %err, "Failed to check Salesforce status");
                (AuthSession::default(), Err(err.into()))
            }
        };

        let was_authenticated = self.lock().session.is_authenticated;
        if self.replace_session(session.clone()) {
            debug!(authenticated = session.is_authenticated, "Salesforce status changed");
            self.emit(AuthEvent::StatusChanged(session));
            if expired && was_authenticated {
                info!("Salesforce session expired");
                self.emit(AuthEvent::Expired);
            }
        }
        result
    }

    /// Reacts to a 401: re-checks the status and broadcasts
    /// [`AuthEvent::Invalidated`] if the session is not valid.
    ///
    /// Returns true when the session was invalidated.
    pub async fn handle_unauthorized(&self) -> bool {
        let valid = match self.refresh_status().await {
            Ok(session) => session.is_valid_at(Utc::now()),
            Err(Error::Cancelled) => return false,
            Err(_) => false,
        };
        if valid {
            return false;
        }
        warn!("Salesforce session invalidated");
        self.emit(AuthEvent::Invalidated);
        true
    }

    /// Clears the session if it expired by `now`, broadcasts
    /// [`AuthEvent::Expired`], and starts a best-effort backend logout.
    ///
    /// Returns the logout task when the session expired.
    pub fn check_expiry(&self, now: DateTime<Utc>) -> Option<JoinHandle<()>> {
        {
            let mut state = self.lock();
            if !state.session.is_authenticated || !state.session.is_expired_at(now) {
                return None;
            }
            state.session = AuthSession::default();
        }

        info!("Salesforce session expired");
        self.emit(AuthEvent::Expired);

        let backend = Arc::clone(&self.backend);
        let token = self.cancel.child_token();
        Some(tokio::spawn(async move {
            if let Err(e) = backend.auth_logout(&token).await
                && !e.is_cancelled()
            {
                debug!(error = %e, "Logout after expiry failed");
            }
        }))
    }

    /// Starts the background loop: an immediate status check, a re-check
    /// every status interval, an expiry check every second, and a re-check
    /// on every 401 the transport reports.
    #[must_use = "the handle can be awaited after dispose"]
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run().await })
    }

    async fn run(&self) {
        let mut unauthorized = self.backend.subscribe_unauthorized();
        let mut status = tokio::time::interval(self.status_interval);
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut expiry =
            tokio::time::interval_at(Instant::now() + EXPIRY_CHECK_INTERVAL, EXPIRY_CHECK_INTERVAL);
        expiry.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                notice = unauthorized.recv() => match notice {
                    Ok(notice) => {
                        debug!(path = %notice.path, "401 observed");
                        self.handle_unauthorized().await;
                        // The re-check itself may have reported a 401.
                        while unauthorized.try_recv().is_ok() {}
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Missed 401 notices");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = status.tick() => {
                    let _ = self.refresh_status().await;
                }
                _ = expiry.tick() => {
                    let _ = self.check_expiry(Utc::now());
                }
            }
        }
        debug!("Salesforce monitor stopped");
    }

    /// Stops the loop and cancels outstanding requests.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

impl Drop for AuthSessionMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
