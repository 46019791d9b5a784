//! Inbound frame and message body validation.

use lovebirds_core::error::AppError;

/// Validates a raw inbound frame.
pub fn validate_inbound(raw: &str, max_size: usize) -> Result<(), AppError> {
    if raw.len() > max_size {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates a chat message body.
pub fn validate_body(body: &str, max_chars: usize) -> Result<(), AppError> {
    if body.trim().is_empty() {
        return Err(AppError::validation("Message body cannot be empty"));
    }

    if body.chars().count() > max_chars {
        return Err(AppError::validation(format!(
            "Message body exceeds {max_chars} characters"
        )));
    }

    Ok(())
}
