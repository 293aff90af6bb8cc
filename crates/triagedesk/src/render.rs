//! Terminal rendering of emails, analysis and session state.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use triagedesk_api::{FeedbackRecord, FeedbackStats};
use triagedesk_core::feedback::format_average;
use triagedesk_core::model::display_or;
use triagedesk_core::{
    AuthSession, DraftStatus, Email, Enrichment, EnrichmentStatus, HealthState,
};
use triagedesk_markup::{is_markup, to_plain};

const NOT_AVAILABLE: &str = "N/A";

fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// One line of the email list.
pub fn list_row(email: &Email) -> String {
    format!(
        "{:<26} {:<16} {:<9} {:<28} {}",
        email.id,
        timestamp(email.timestamp),
        DraftStatus::of(email).label(),
        email.sender,
        email.subject
    )
}

/// Body for display; markup is converted to Markdown.
pub fn body_text(body: &str) -> String {
    if !is_markup(body) {
        return body.trim().to_string();
    }
    match htmd::convert(body) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "Markdown conversion failed, using plain text");
            to_plain(body)
        }
    }
}

/// Analysis summary lines.
pub fn analysis_lines(enrichment: &Enrichment) -> Vec<String> {
    if !enrichment.success {
        return vec![format!(
            "Analysis failed: {}",
            display_or(enrichment.error.as_deref(), "unknown error")
        )];
    }

    let analysis = &enrichment.analysis;
    let mut lines = vec![
        format!(
            "Classification: {}",
            display_or(analysis.classification(), NOT_AVAILABLE)
        ),
        format!(
            "Priority:       {}",
            display_or(analysis.priority_level(), NOT_AVAILABLE)
        ),
        format!(
            "Confidence:     {}",
            analysis
                .confidence_score()
                .map_or_else(|| NOT_AVAILABLE.to_string(), |c| format!("{c:.2}"))
        ),
        format!(
            "Case:           {}",
            display_or(analysis.case_number(), NOT_AVAILABLE)
        ),
        format!(
            "Routing:        {}",
            display_or(analysis.routing_team(), NOT_AVAILABLE)
        ),
    ];
    if let Some(review) = analysis.requires_human_review() {
        lines.push(format!(
            "Human review:   {}",
            if review { "required" } else { "not required" }
        ));
    }
    if !analysis.key_indicators().is_empty() {
        lines.push(format!(
            "Indicators:     {}",
            analysis.key_indicators().join(", ")
        ));
    }
    if let Some(entities) = analysis.extracted_entities().filter(|m| !m.is_empty()) {
        let pairs: Vec<String> = entities
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| match value {
                Value::String(text) => format!("{key}={text}"),
                other => format!("{key}={other}"),
            })
            .collect();
        if !pairs.is_empty() {
            lines.push(format!("Entities:       {}", pairs.join(", ")));
        }
    }
    lines
}

/// Full view of one email with its effective draft. `status` is the
/// enrichment status tracked for the email, shown while it has no analysis.
pub fn email_detail(email: &Email, status: Option<&EnrichmentStatus>, draft: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Subject:  {}", email.subject);
    let _ = writeln!(out, "From:     {}", email.sender);
    let _ = writeln!(out, "To:       {}", email.recipients.join(", "));
    let _ = writeln!(out, "Received: {}", timestamp(email.timestamp));
    let _ = writeln!(out, "Id:       {}", email.id);
    if let Some(message_id) = &email.message_id {
        let _ = writeln!(out, "Message:  {message_id}");
    }
    for attachment in &email.attachments {
        let _ = writeln!(
            out,
            "Attached: {} ({} bytes)",
            attachment.name, attachment.size
        );
    }

    let _ = writeln!(out, "\n{}", body_text(&email.body));

    let _ = writeln!(out, "\n-- Analysis --");
    match &email.enrichment {
        Some(enrichment) => {
            for line in analysis_lines(enrichment) {
                let _ = writeln!(out, "{line}");
            }
        }
        None => {
            let _ = writeln!(out, "{}", pending_analysis(status));
        }
    }

    let _ = writeln!(out, "\n-- Draft ({}) --", DraftStatus::of(email).label());
    let _ = write!(out, "{draft}");
    out
}

fn pending_analysis(status: Option<&EnrichmentStatus>) -> String {
    match status {
        Some(EnrichmentStatus::Failed(message)) => format!("Analysis failed: {message}"),
        Some(EnrichmentStatus::Loading) => "Loading...".to_string(),
        Some(EnrichmentStatus::Unavailable) | None => "Not available yet".to_string(),
    }
}

/// Session summary for `salesforce status`.
pub fn session_summary(session: &AuthSession, now: DateTime<Utc>) -> String {
    if !session.is_valid_at(now) {
        return "Not connected to Salesforce".to_string();
    }
    let mut out = format!(
        "Connected as {}",
        session.user_label().unwrap_or("unknown user")
    );
    if let Some(remaining) = session.format_remaining(now) {
        let _ = write!(out, " (expires in {remaining})");
    }
    out
}

/// Health line.
pub fn health_line(state: HealthState, checked: Option<DateTime<Utc>>) -> String {
    match checked {
        Some(at) => format!("{state} (checked {})", timestamp(Some(at))),
        None => state.to_string(),
    }
}

/// One feedback record.
pub fn feedback_row(record: &FeedbackRecord) -> String {
    format!(
        "{:<26} {:<12} {:<6} {}",
        record.id,
        record.feedback_type.as_str(),
        record
            .rating
            .map_or_else(|| "-".to_string(), |r| format!("{r}/5")),
        record.comment.as_deref().unwrap_or("")
    )
}

/// Aggregated feedback.
pub fn feedback_stats(stats: &FeedbackStats) -> String {
    let by_type = &stats.feedback_by_type;
    format!(
        "Total: {}  Average rating: {}\n\
         positive {}  negative {}  neutral {}  helpful {}  not helpful {}",
        stats.total_feedback,
        format_average(stats.average_rating),
        by_type.positive,
        by_type.negative,
        by_type.neutral,
        by_type.helpful,
        by_type.not_helpful,
    )
}
