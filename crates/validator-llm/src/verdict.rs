// Verdict parsing for model replies.
//
// The model is instructed to answer with exactly `CORRECT` or
// `WRONG: <description>`. Replies are parsed leniently (case, one wrapping
// pair of quotes, trailing punctuation) and anything else is kept verbatim.

use std::fmt;

/// Placeholder used when the model says WRONG without saying why.
pub const MISSING_DESCRIPTION: &str = "no description given";

/// The outcome of checking a piece of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The model judged the data to be correct.
    Correct,
    /// The model found an error and described it.
    Wrong { description: String },
    /// The model replied with something other than the two expected shapes.
    Unrecognized(String),
}

impl Verdict {
    /// Parse a raw model reply into a `Verdict`.
    ///
    /// - `CORRECT`, `correct.`, `"CORRECT"` -> `Correct`
    /// - `WRONG: the price is lower`, `Wrong - ...` -> `Wrong { .. }`
    /// - `CORRECTION: ...`, `I think so` -> `Unrecognized(..)`
    ///
    /// Unrecognized replies keep the whitespace-trimmed text as-is, quotes
    /// included.
    pub fn parse(reply: &str) -> Self {
        let trimmed = reply.trim();
        let text = unwrap_quotes(trimmed).trim();

        if let Some(rest) = strip_keyword(text, "CORRECT") {
            let rest = rest.trim_matches(|c: char| c == '.' || c == '!' || c.is_whitespace());
            if rest.is_empty() {
                return Verdict::Correct;
            }
            return Verdict::Unrecognized(trimmed.to_string());
        }

        if let Some(rest) = strip_keyword(text, "WRONG") {
            let description =
                rest.trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace());
            let description = description.trim();
            let description = if description.is_empty() {
                MISSING_DESCRIPTION.to_string()
            } else {
                description.to_string()
            };
            return Verdict::Wrong { description };
        }

        Verdict::Unrecognized(trimmed.to_string())
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }

    /// True when the reply matched one of the two expected shapes.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Verdict::Unrecognized(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "CORRECT"),
            Verdict::Wrong { description } => write!(f, "WRONG: {description}"),
            Verdict::Unrecognized(text) => write!(f, "{text}"),
        }
    }
}

/// Remove one pair of matching quotes (`"`, `'` or backtick) wrapping the
/// whole of `text`. Anything else is returned unchanged.
fn unwrap_quotes(text: &str) -> &str {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && matches!(first, '"' | '\'' | '`') => {
            chars.as_str()
        }
        _ => text,
    }
}

/// Strip a leading ASCII keyword (case-insensitive) when it stands as a whole
/// word, returning the remainder.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let len = keyword.len();
    if text.len() < len || !text.is_char_boundary(len) {
        return None;
    }
    if !text[..len].eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[len..];
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(rest),
    }
}
