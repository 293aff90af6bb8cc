//! Subcommand implementations.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use triagedesk_api::NewEmail;
use triagedesk_core::{
    AuthEvent, AuthSessionMonitor, Backend, Config, DraftReconciler, Email, EmailSyncController,
    EnrichmentStatus, FeedbackInput, FeedbackService, HealthMonitor, HealthState, HttpBackend,
    Inbox, InboxEvent,
};

use crate::cli::{Command, DraftAction, DraftText, FeedbackAction, SalesforceAction};
use crate::notify;
use crate::render;
use crate::state::PendingLoginStore;

/// Shared wiring for every subcommand.
pub struct App {
    config: Config,
    backend: Arc<HttpBackend>,
    inbox: Inbox,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let backend =
            Arc::new(HttpBackend::from_config(&config).context("creating the API client")?);
        Ok(Self {
            config,
            backend,
            inbox: Inbox::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Watch { notify } => self.watch(notify).await,
            Command::List { limit } => self.list(limit).await,
            Command::Show { id } => self.show(&id).await,
            Command::Create {
                subject,
                sender,
                recipients,
                body,
            } => {
                let email = NewEmail {
                    subject,
                    sender,
                    recipients,
                    body,
                    timestamp: Some(Utc::now().to_rfc3339()),
                    ..NewEmail::default()
                };
                self.create(&email).await
            }
            Command::Draft { action } => self.draft(action).await,
            Command::Feedback { action } => self.feedback(action).await,
            Command::Salesforce { action } => self.salesforce(action).await,
            Command::Health => self.health().await,
        }
    }

    fn controller(&self) -> EmailSyncController {
        EmailSyncController::new(self.backend.clone(), self.inbox.clone(), &self.config)
    }

    fn drafts(&self) -> DraftReconciler {
        DraftReconciler::new(
            self.backend.clone(),
            self.inbox.clone(),
            self.cancel.child_token(),
        )
    }

    async fn load(&self) -> anyhow::Result<EmailSyncController> {
        let controller = self.controller();
        controller
            .refresh_emails()
            .await
            .context("fetching emails")?;
        Ok(controller)
    }

    /// Loads the list, selects `key` and waits for its analysis. Emails not
    /// in the list are fetched individually.
    async fn open(&self, key: &str) -> anyhow::Result<Email> {
        let controller = self.load().await?;
        let email = match self.inbox.find(key) {
            Some(email) => email,
            None => self
                .backend
                .get_email(key, &self.cancel.child_token())
                .await
                .with_context(|| format!("no email with id {key}"))?,
        };
        if let Some(fetch) = controller.select_email(email.clone()) {
            fetch.await.context("analysis fetch task")?;
        }
        Ok(self.inbox.selected().unwrap_or(email))
    }

    async fn list(&self, limit: Option<usize>) -> anyhow::Result<()> {
        self.load().await?;
        let emails = self.inbox.emails();
        if emails.is_empty() {
            println!("No emails");
            return Ok(());
        }
        for email in emails.iter().take(limit.unwrap_or(usize::MAX)) {
            println!("{}", render::list_row(email));
        }
        Ok(())
    }

    async fn show(&self, key: &str) -> anyhow::Result<()> {
        let email = self.open(key).await?;
        let draft = self.drafts().content(&email.id)?;
        let status = self.inbox.enrichment_status(email.transport_id());
        println!("{}", render::email_detail(&email, status.as_ref(), &draft));
        Ok(())
    }

    async fn create(&self, email: &NewEmail) -> anyhow::Result<()> {
        let created = self
            .controller()
            .create_email(email)
            .await
            .context("creating the email")?;
        println!("Created {}", created.id);
        Ok(())
    }

    async fn draft(&self, action: DraftAction) -> anyhow::Result<()> {
        let drafts = self.drafts();
        match action {
            DraftAction::Show { id, markup } => {
                let email = self.open(&id).await?;
                if let Some(EnrichmentStatus::Failed(message)) =
                    self.inbox.enrichment_status(email.transport_id())
                {
                    eprintln!("Analysis failed: {message}");
                }
                let text = if markup {
                    drafts.preview(&email.id)?
                } else {
                    drafts.content(&email.id)?
                };
                println!("{text}");
            }
            DraftAction::Save { id, content } => {
                let email = self.open(&id).await?;
                let text = draft_text(&content, &drafts, &email).await?;
                drafts.save_draft(&email.id, &text).await?;
                println!("Draft saved for {}", email.id);
            }
            DraftAction::Send { id, content } => {
                let email = self.open(&id).await?;
                let text = draft_text(&content, &drafts, &email).await?;
                let sent = drafts.send_draft(&email.id, &text).await?;
                println!(
                    "Sent to {} from {}",
                    email.sender,
                    sent.sender_email.as_deref().unwrap_or("the support mailbox")
                );
            }
        }
        Ok(())
    }

    async fn feedback(&self, action: FeedbackAction) -> anyhow::Result<()> {
        let service = FeedbackService::new(self.backend.clone(), self.cancel.child_token());
        match action {
            FeedbackAction::Submit {
                email_id,
                kind,
                rating,
                comment,
                user,
            } => {
                let input = FeedbackInput {
                    feedback_type: kind,
                    rating,
                    comment,
                    user_id: user,
                };
                let record = service.submit(&email_id, &input).await?;
                println!("Recorded feedback {}", record.id);
            }
            FeedbackAction::List { email_id } => {
                let records = service.list_for_email(&email_id).await?;
                if records.is_empty() {
                    println!("No feedback for {email_id}");
                }
                for record in &records {
                    println!("{}", render::feedback_row(record));
                }
            }
            FeedbackAction::Stats { email_id } => {
                let stats = service.stats_for_email(&email_id).await?;
                println!("{}", render::feedback_stats(&stats));
            }
            FeedbackAction::Delete { id } => {
                service.delete(&id).await?;
                println!("Deleted feedback {id}");
            }
        }
        Ok(())
    }

    async fn salesforce(&self, action: SalesforceAction) -> anyhow::Result<()> {
        let monitor = AuthSessionMonitor::new(self.backend.clone(), &self.config);
        let store = PendingLoginStore::default_location();
        match action {
            SalesforceAction::Login { no_browser } => {
                let login = monitor.login().await?;
                store.save(&login.state).await?;
                if no_browser {
                    println!("{}", login.login_url);
                } else if let Err(e) = opener::open(&login.login_url) {
                    warn!(error = %e, "Could not open a browser");
                    println!("Open this URL to sign in:\n{}", login.login_url);
                } else {
                    println!("Complete the sign-in in your browser.");
                }
            }
            SalesforceAction::Callback { code, state } => {
                if let Some(pending) = store.load().await? {
                    monitor.restore_pending_state(pending);
                }
                let session = monitor.complete_login(&code, &state).await?;
                store.clear().await?;
                println!("{}", render::session_summary(&session, Utc::now()));
            }
            SalesforceAction::Status => {
                let session = monitor.refresh_status().await?;
                println!("{}", render::session_summary(&session, Utc::now()));
            }
            SalesforceAction::Logout => {
                monitor.logout().await?;
                println!("Logged out of Salesforce");
            }
        }
        Ok(())
    }

    async fn health(&self) -> anyhow::Result<()> {
        let monitor = HealthMonitor::new(self.backend.clone(), &self.config);
        let state = monitor.check().await;
        let status = monitor.status();
        println!("{}", render::health_line(state, status.last_checked));
        if state != HealthState::Connected {
            bail!("backend at {} is unreachable", self.config.api_base_url);
        }
        Ok(())
    }

    /// Polls until interrupted, printing new emails and session and health
    /// changes.
    async fn watch(&self, notify: bool) -> anyhow::Result<()> {
        let controller = Arc::new(self.controller());
        let health = Arc::new(HealthMonitor::new(self.backend.clone(), &self.config));
        let auth = Arc::new(AuthSessionMonitor::new(self.backend.clone(), &self.config));

        let mut inbox_events = self.inbox.subscribe();
        let mut auth_events = auth.subscribe();
        let mut health_status = health.watch();

        let polling = controller.start_polling();
        let health_task = health.start();
        let auth_task = auth.start();
        info!(
            api = %self.config.api_base_url,
            interval = ?controller.poll_interval(),
            "Watching inbox"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut known: Option<HashSet<String>> = None;
        let mut last_health = HealthState::Checking;
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result.context("waiting for Ctrl-C")?;
                    break;
                }
                event = inbox_events.recv() => match event {
                    Ok(InboxEvent::EmailsReplaced { count }) => {
                        let emails = self.inbox.emails();
                        if let Some(known) = &known {
                            for email in emails.iter().filter(|e| !known.contains(&e.id)) {
                                println!("New: {}", render::list_row(email));
                                if notify {
                                    notify::new_email(email).await;
                                }
                            }
                        } else {
                            println!("{count} emails");
                        }
                        known = Some(emails.into_iter().map(|e| e.id).collect());
                    }
                    Ok(InboxEvent::FetchFailed { message }) => {
                        eprintln!("Fetch failed: {message}");
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Missed inbox events"),
                    Err(RecvError::Closed) => break,
                },
                event = auth_events.recv() => match event {
                    Ok(AuthEvent::Expired) => eprintln!("Salesforce session expired"),
                    Ok(AuthEvent::Invalidated) => {
                        eprintln!("Salesforce session is no longer valid; run `triagedesk salesforce login`");
                    }
                    Ok(AuthEvent::StatusChanged(session)) => {
                        println!("{}", render::session_summary(&session, Utc::now()));
                    }
                    Ok(AuthEvent::LoggedOut) => {}
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Missed session events"),
                    Err(RecvError::Closed) => break,
                },
                changed = health_status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = *health_status.borrow_and_update();
                    if status.state != HealthState::Checking && status.state != last_health {
                        last_health = status.state;
                        println!("{}", render::health_line(status.state, status.last_checked));
                    }
                }
            }
        }

        info!("Shutting down");
        controller.dispose();
        health.dispose();
        auth.dispose();
        polling.shutdown().await;
        health_task.await.context("health task")?;
        auth_task.await.context("session task")?;
        Ok(())
    }
}

/// Text from the flags, or the email's current draft when none was given.
async fn draft_text(
    content: &DraftText,
    drafts: &DraftReconciler,
    email: &Email,
) -> anyhow::Result<String> {
    if let Some(text) = &content.text {
        return Ok(text.clone());
    }
    if let Some(path) = &content.file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()));
    }
    Ok(drafts.content(&email.id)?)
}
