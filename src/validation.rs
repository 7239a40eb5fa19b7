//! Shared checks for identifiers supplied by clients (session ids, request ids).

use crate::constants::MAX_ID_LEN;

/// 1 to 128 characters, ASCII letters, digits, hyphen and underscore only.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn validate_session_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Session id must not be empty");
    }
    if id.len() > MAX_ID_LEN {
        return Err("Session id must be at most 128 characters");
    }
    if !is_valid_id(id) {
        return Err("Session id may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}
