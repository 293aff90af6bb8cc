//! Plain text to markup rendering.

use std::fmt::Write as _;

use crate::entity::escape_text;

/// Line that stands for a horizontal rule in plain text.
pub(crate) const SEPARATOR: &str = "---";

/// Disclaimer appended to every rendered draft.
pub const DISCLAIMER: &str =
    "This is an automated acknowledgment. Please do not reply to this email.";

const CONTAINER_OPEN: &str = "<div style=\"font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, \
     'Helvetica Neue', Arial, sans-serif; line-height: 1.6; color: #333; max-width: 100%;\">";
const PARAGRAPH_OPEN: &str = "<p style=\"margin: 0 0 16px 0; line-height: 1.5;\">";
const SEPARATOR_RULE: &str = "<hr style=\"border: none; border-top: 1px solid #ddd; margin: 16px 0;\">";
const DISCLAIMER_RULE: &str =
    "<hr style=\"border: none; border-top: 1px solid #e5e7eb; margin: 24px 0;\">";
const DISCLAIMER_OPEN: &str =
    "<p style=\"font-size: 12px; color: #6b7280; margin: 0; font-style: italic;\">";

/// Renders edited plain text as draft markup.
///
/// Blank lines separate paragraphs, a paragraph consisting of `---` becomes a
/// horizontal rule, and single newlines inside a paragraph become `<br>`.
/// Text is escaped, and the disclaimer is always appended. Blank input
/// renders as an empty string.
#[must_use]
pub fn to_markup(text: &str) -> String {
    let paragraphs = split_paragraphs(text);
    if paragraphs.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(CONTAINER_OPEN);
    out.push('\n');

    for paragraph in &paragraphs {
        if let [line] = paragraph.as_slice()
            && *line == SEPARATOR
        {
            let _ = writeln!(out, "  {SEPARATOR_RULE}");
            continue;
        }

        let body = paragraph
            .iter()
            .map(|line| escape_text(line))
            .collect::<Vec<_>>()
            .join("<br>");
        let _ = writeln!(out, "  {PARAGRAPH_OPEN}{body}</p>");
    }

    let _ = writeln!(out, "  {DISCLAIMER_RULE}");
    let _ = writeln!(out, "  {DISCLAIMER_OPEN}{DISCLAIMER}</p>");
    out.push_str("</div>");
    out
}

/// Groups trimmed, non-blank lines into paragraphs separated by blank lines.
fn split_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}
