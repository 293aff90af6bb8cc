//! Salesforce session state.

use chrono::{DateTime, TimeDelta, Utc};
use triagedesk_api::{AuthStatusResponse, SalesforceUser};

use crate::model::parse_timestamp;

/// Text shown once a session has run out.
pub const EXPIRED: &str = "Expired";

/// External session as last reported by the backend.
///
/// A session whose expiry has passed is never authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    /// Whether the session is usable.
    pub is_authenticated: bool,
    /// When the session runs out.
    pub expires_at: Option<DateTime<Utc>>,
    /// Connected user.
    pub user: Option<SalesforceUser>,
}

impl AuthSession {
    /// Builds the session from a status response as of `now`.
    #[must_use]
    pub fn from_status(status: AuthStatusResponse, now: DateTime<Utc>) -> Self {
        let expires_at = status.expires_at.as_deref().and_then(parse_timestamp);
        let expired = expires_at.is_some_and(|at| at <= now);
        Self {
            is_authenticated: status.is_authenticated && !expired,
            expires_at: if expired { None } else { expires_at },
            user: status.user.filter(|_| status.is_authenticated && !expired),
        }
    }

    /// Whether the session is authenticated and unexpired at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_authenticated && !self.is_expired_at(now)
    }

    /// Whether the expiry has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Time left at `now`, if an expiry is known. Zero once expired.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.expires_at
            .map(|at| (at - now).max(TimeDelta::zero()))
    }

    /// Time left at `now` as `H:MM:SS`, or [`EXPIRED`].
    #[must_use]
    pub fn format_remaining(&self, now: DateTime<Utc>) -> Option<String> {
        self.time_remaining(now).map(format_remaining)
    }

    /// Display name for the connected user.
    #[must_use]
    pub fn user_label(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        user.name
            .as_deref()
            .or(user.username.as_deref())
            .or(user.email.as_deref())
    }
}

/// Formats a duration as `H:MM:SS`; zero or negative is [`EXPIRED`].
#[must_use]
pub fn format_remaining(remaining: TimeDelta) -> String {
    let total = remaining.num_seconds();
    if total <= 0 {
        return EXPIRED.to_string();
    }
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 15, 12, 0, 0).unwrap()
    }

    fn status(authenticated: bool, expires_at: Option<&str>) -> AuthStatusResponse {
        AuthStatusResponse {
            is_authenticated: authenticated,
            expires_at: expires_at.map(str::to_string),
            user: Some(SalesforceUser {
                name: Some("Jo Reviewer".to_string()),
                ..SalesforceUser::default()
            }),
        }
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(TimeDelta::seconds(3725)), "1:02:05");
        assert_eq!(format_remaining(TimeDelta::seconds(59)), "0:00:59");
        assert_eq!(format_remaining(TimeDelta::hours(26)), "26:00:00");
        assert_eq!(format_remaining(TimeDelta::zero()), EXPIRED);
        assert_eq!(format_remaining(TimeDelta::seconds(-5)), EXPIRED);
    }

    #[test]
    fn test_valid_session() {
        let session =
            AuthSession::from_status(status(true, Some("2024-12-15T13:30:00Z")), now());
        assert!(session.is_valid_at(now()));
        assert_eq!(session.format_remaining(now()).as_deref(), Some("1:30:00"));
        assert_eq!(session.user_label(), Some("Jo Reviewer"));
    }

    #[test]
    fn test_past_expiry_is_not_authenticated() {
        let session =
            AuthSession::from_status(status(true, Some("2024-12-15T11:00:00Z")), now());
        assert!(!session.is_authenticated);
        assert_eq!(session.expires_at, None);
        assert_eq!(session.user, None);
    }

    #[test]
    fn test_expiry_passes() {
        let session =
            AuthSession::from_status(status(true, Some("2024-12-15T12:00:10Z")), now());
        let later = now() + TimeDelta::seconds(10);
        assert!(session.is_expired_at(later));
        assert!(!session.is_valid_at(later));
        assert_eq!(session.format_remaining(later).as_deref(), Some(EXPIRED));
    }

    #[test]
    fn test_unparseable_expiry_is_ignored() {
        let session = AuthSession::from_status(status(true, Some("soon")), now());
        assert!(session.is_authenticated);
        assert_eq!(session.time_remaining(now()), None);
    }
}
