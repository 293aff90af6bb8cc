//! # triagedesk-markup
//!
//! Conversion between the stored (markup) form of an email draft and the
//! plain-text projection that reviewers edit.
//!
//! ## Features
//!
//! - **Plain-text projection**: block tags become blank lines, `<br>` becomes a
//!   newline, `<hr>` becomes a `---` separator line, other tags are stripped
//! - **Entity decoding**: named and numeric character references
//! - **Rendering**: paragraphs, separators and line breaks back to markup,
//!   always followed by the automated-reply disclaimer
//! - **Convergence**: `to_plain(to_markup(text))` is stable, so repeated
//!   edit/save cycles never drift
//!
//! ## Quick Start
//!
//! ```
//! use triagedesk_markup::{to_markup, to_plain};
//!
//! let stored = "<p>Hello,</p><p>Your case is open.<br>Ref: 42</p>";
//! let editable = to_plain(stored);
//! assert_eq!(editable, "Hello,\n\nYour case is open.\nRef: 42");
//!
//! let rendered = to_markup(&editable);
//! assert_eq!(to_plain(&rendered), editable);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod entity;
mod plain;
mod render;
mod tokenizer;

pub use entity::{decode_entities, escape_text};
pub use plain::{normalize_whitespace, strip_disclaimer, to_editable, to_plain};
pub use render::{DISCLAIMER, to_markup};
pub use tokenizer::is_markup;
