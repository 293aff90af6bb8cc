//! Minimal tag tokenizer.
//!
//! This is not an HTML parser. Anything between `<` and the next `>` is a tag;
//! a `<` with no closing `>` is literal text.

/// A lexical token of a markup string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text between tags (entities still encoded).
    Text(&'a str),
    /// A tag, without the surrounding angle brackets.
    Tag(Tag<'a>),
}

/// A parsed tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Tag name as written (e.g. `p`, `BR`, `!--`).
    pub name: &'a str,
    /// Whether this is a closing tag (`</p>`).
    pub closing: bool,
}

impl Tag<'_> {
    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns true for tags that separate blocks of text.
    #[must_use]
    pub fn is_block(&self) -> bool {
        const BLOCK_TAGS: &[&str] = &[
            "p",
            "div",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "ul",
            "ol",
            "li",
            "blockquote",
            "table",
            "tr",
            "section",
            "article",
            "header",
            "footer",
        ];
        BLOCK_TAGS.iter().any(|b| self.is(b))
    }
}

/// Iterator over the tokens of a markup string.
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    /// Creates a tokenizer over `input`.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        if self.rest.starts_with('<')
            && let Some(end) = self.rest.find('>')
        {
            let inner = &self.rest[1..end];
            self.rest = &self.rest[end + 1..];
            return Some(Token::Tag(parse_tag(inner)));
        }

        // Text runs until the next '<' that opens a tag. If that '<' has no
        // '>' after it, no later one does either.
        let start = usize::from(self.rest.starts_with('<'));
        let split = self.rest[start..]
            .find('<')
            .map(|offset| start + offset)
            .filter(|&idx| self.rest[idx..].contains('>'))
            .unwrap_or(self.rest.len());

        let (text, rest) = self.rest.split_at(split);
        self.rest = rest;
        Some(Token::Text(text))
    }
}

fn parse_tag(inner: &str) -> Tag<'_> {
    let trimmed = inner.trim_start();
    let (closing, body) = trimmed
        .strip_prefix('/')
        .map_or((false, trimmed), |rest| (true, rest.trim_start()));
    let end = body
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(body.len());
    Tag {
        name: &body[..end],
        closing,
    }
}

/// Returns true if `content` contains at least one tag.
#[must_use]
pub fn is_markup(content: &str) -> bool {
    Tokens::new(content).any(|t| matches!(t, Token::Tag(_)))
}
