//! Text message decoding (data type `:`).
//!
//! Format: `:ADDRESSEE:text{ID` where the addressee is exactly 9 bytes,
//! space padded, and `{ID` is an optional correlation suffix.

use crate::types::{AprsError, Result};

const ADDRESSEE_LEN: usize = 9;

/// Fields of a decoded message, before the sender is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFields {
    pub to: String,
    pub text: String,
    pub id: Option<String>,
}

/// Decode a `:` payload (data type identifier included).
pub fn parse_message(payload: &[u8]) -> Result<MessageFields> {
    let body = payload.get(1..).unwrap_or_default();
    // addressee + ':' + at least one byte of text
    if body.len() < ADDRESSEE_LEN + 2 {
        return Err(AprsError::FieldFormat("message packet too short".into()));
    }

    let to = String::from_utf8_lossy(&body[..ADDRESSEE_LEN])
        .trim()
        .to_string();
    if to.is_empty() {
        return Err(AprsError::FieldFormat("message recipient is blank".into()));
    }

    if body[ADDRESSEE_LEN] != b':' {
        return Err(AprsError::FieldFormat(
            "missing message body separator ':'".into(),
        ));
    }

    let rest = String::from_utf8_lossy(&body[ADDRESSEE_LEN + 1..]);
    let (text, id) = match rest.rfind('{') {
        // A leading '{' is text, not a correlation id.
        Some(idx) if idx > 0 => (
            rest[..idx].trim().to_string(),
            Some(rest[idx + 1..].trim().to_string()),
        ),
        _ => (rest.trim().to_string(), None),
    };

    if text.is_empty() {
        return Err(AprsError::FieldFormat("message body is blank".into()));
    }

    Ok(MessageFields { to, text, id })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
