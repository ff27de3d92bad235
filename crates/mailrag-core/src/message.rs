//! Raw message parsing.
//!
//! A message file is plain text: `Subject:`, `From:` and `To:` header
//! lines, then a blank line, then the body. Header lines are matched at
//! the start of a line (leading whitespace ignored); the first matching
//! line wins for each field.
//!
//! The body is found by splitting the text on `"\n\n"` at most three
//! times and taking the final piece, trimmed. With a single blank line
//! after the headers that is the whole body; a body containing further
//! blank lines keeps only what follows the third separator.

use crate::error::{Error, Result};
use crate::models::Message;

/// Parse one raw message into its header fields and body.
///
/// CRLF line endings are normalized to LF first.
///
/// # Errors
///
/// [`Error::MalformedMessage`] when `Subject:`, `From:` or `To:` is
/// missing, or when the first matching line has an empty value.
pub fn parse_message(raw: &str) -> Result<Message> {
    let text = raw.replace("\r\n", "\n");

    let subject = header_value(&text, "Subject")?;
    let sender = header_value(&text, "From")?;
    let receiver = header_value(&text, "To")?;

    let body = text
        .splitn(4, "\n\n")
        .last()
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(Message {
        subject,
        sender,
        receiver,
        body,
    })
}

fn header_value(text: &str, field: &'static str) -> Result<String> {
    let value = text
        .lines()
        .find_map(|line| {
            line.trim_start()
                .strip_prefix(field)
                .and_then(|rest| rest.strip_prefix(':'))
        })
        .map(str::trim)
        .unwrap_or_default();

    if value.is_empty() {
        return Err(Error::MalformedMessage { field });
    }
    Ok(value.to_string())
}
