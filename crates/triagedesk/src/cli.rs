//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use triagedesk_api::FeedbackType;

/// Email triage dashboard client.
#[derive(Debug, Parser)]
#[command(name = "triagedesk", version, about)]
pub struct Cli {
    /// Backend base URL; overrides `TRIAGEDESK_API_URL`.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the inbox and report changes until interrupted.
    Watch {
        /// Show a desktop notification for each new email.
        #[arg(long)]
        notify: bool,
    },
    /// List emails, newest first.
    List {
        /// Show at most this many emails.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one email with its analysis and draft.
    Show {
        /// Primary id or message id.
        id: String,
    },
    /// Create an email record.
    Create {
        /// Subject line.
        #[arg(long)]
        subject: String,
        /// Sender address.
        #[arg(long)]
        sender: String,
        /// Recipient address; repeat for several.
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,
        /// Body text.
        #[arg(long)]
        body: Option<String>,
    },
    /// Work with acknowledgment drafts.
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Record and review draft feedback.
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
    /// Manage the Salesforce session.
    Salesforce {
        #[command(subcommand)]
        action: SalesforceAction,
    },
    /// Check backend connectivity.
    Health,
}

/// Draft text given on the command line or in a file.
#[derive(Debug, Args)]
pub struct DraftText {
    /// Draft text.
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,
    /// Read the draft text from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum DraftAction {
    /// Print the effective draft.
    Show {
        /// Primary id or message id.
        id: String,
        /// Print the markup that would be sent.
        #[arg(long)]
        markup: bool,
    },
    /// Save a draft without sending it.
    Save {
        /// Primary id or message id.
        id: String,
        #[command(flatten)]
        content: DraftText,
    },
    /// Save and send the draft. Without text, the current draft is sent.
    Send {
        /// Primary id or message id.
        id: String,
        #[command(flatten)]
        content: DraftText,
    },
}

#[derive(Debug, Subcommand)]
pub enum FeedbackAction {
    /// Record feedback for an email.
    Submit {
        /// Primary id of the email.
        email_id: String,
        /// positive, negative, neutral, helpful or not_helpful.
        #[arg(long = "type")]
        kind: FeedbackType,
        /// Rating from 1 to 5; 0 means unrated.
        #[arg(long)]
        rating: Option<u8>,
        /// Free-text comment.
        #[arg(long)]
        comment: Option<String>,
        /// Reviewer id.
        #[arg(long)]
        user: Option<String>,
    },
    /// List feedback for an email.
    List {
        /// Primary id of the email.
        email_id: String,
    },
    /// Show aggregated feedback for an email.
    Stats {
        /// Primary id of the email.
        email_id: String,
    },
    /// Delete a feedback record.
    Delete {
        /// Record id.
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SalesforceAction {
    /// Start the OAuth login and open the authorization page.
    Login {
        /// Print the URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
    },
    /// Complete a login with the code and state from the redirect.
    Callback {
        /// Authorization code.
        code: String,
        /// State from the redirect.
        state: String,
    },
    /// Show the session status.
    Status,
    /// End the session.
    Logout,
}
