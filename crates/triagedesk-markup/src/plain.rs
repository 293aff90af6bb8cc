//! Markup to plain-text projection.

use crate::entity::decode_entities;
use crate::render::SEPARATOR;
use crate::tokenizer::{Token, Tokens, is_markup};

/// Leading words of the automated-reply disclaimer, matched case-insensitively.
const DISCLAIMER_MARKER: &str = "this is an automated acknowledgment";

/// Converts stored draft markup into the plain text shown in the editor.
///
/// - block tags (`<p>`, `<div>`, ...) become blank lines
/// - `<hr>` becomes a `---` separator line
/// - `<br>` becomes a newline
/// - every other tag is dropped, its content kept
/// - character references are decoded
/// - whitespace is normalized (see [`normalize_whitespace`])
/// - a trailing automated-reply disclaimer is removed (see [`strip_disclaimer`])
#[must_use]
pub fn to_plain(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());

    for token in Tokens::new(markup) {
        match token {
            Token::Text(t) => text.push_str(t),
            Token::Tag(tag) if tag.is("br") => text.push('\n'),
            Token::Tag(tag) if tag.is("hr") => {
                text.push('\n');
                text.push_str(SEPARATOR);
                text.push('\n');
            }
            Token::Tag(tag) if tag.is_block() => text.push_str("\n\n"),
            Token::Tag(_) => {}
        }
    }

    let decoded = decode_entities(&text);
    strip_disclaimer(&normalize_whitespace(&decoded))
}

/// Returns the editable text for stored draft content.
///
/// Markup goes through [`to_plain`]; content without any tag is returned
/// unchanged.
#[must_use]
pub fn to_editable(content: &str) -> String {
    if is_markup(content) {
        to_plain(content)
    } else {
        content.to_string()
    }
}

/// Normalizes whitespace so that repeated conversions converge.
///
/// Runs of horizontal whitespace collapse to one space, lines are trimmed,
/// runs of blank lines collapse to a single blank line, and the result is
/// trimmed.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.split('\n') {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }

    out
}

/// Removes the automated-reply disclaimer from the end of `text`.
///
/// The disclaimer is recognized only on the last line. When found, the
/// separator line that the renderer places before it is removed as well.
#[must_use]
pub fn strip_disclaimer(text: &str) -> String {
    let last_line_start = text.rfind('\n').map_or(0, |i| i + 1);
    let lowered = text[last_line_start..].to_ascii_lowercase();

    let Some(pos) = lowered.find(DISCLAIMER_MARKER) else {
        return text.to_string();
    };

    let kept = text[..last_line_start + pos].trim_end();
    let kept = match kept.rsplit_once('\n') {
        Some((head, last)) if last.trim() == SEPARATOR => head.trim_end(),
        None if kept.trim() == SEPARATOR => "",
        _ => kept,
    };

    kept.trim().to_string()
}
