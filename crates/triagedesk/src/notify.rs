//! Desktop notifications.

use notify_rust::Notification;
use triagedesk_core::Email;

const APP_NAME: &str = "triagedesk";

/// Announces a new email. Failures are logged and otherwise ignored.
pub async fn new_email(email: &Email) {
    let summary = format!("New email from {}", email.sender);
    let body = email.subject.clone();

    let shown = tokio::task::spawn_blocking(move || {
        Notification::new()
            .appname(APP_NAME)
            .summary(&summary)
            .body(&body)
            .show()
            .map(|_| ())
            .map_err(|e| e.to_string())
    })
    .await;

    match shown {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Desktop notification failed"),
        Err(e) => tracing::warn!(error = %e, "Notification task failed"),
    }
}
