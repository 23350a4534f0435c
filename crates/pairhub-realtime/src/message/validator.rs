//! Message validation rules.

use pairhub_core::error::AppError;

/// Longest accepted channel name.
const MAX_CHANNEL_NAME_LEN: usize = 256;

/// Longest accepted pair name.
const MAX_PAIR_LEN: usize = 64;

/// Validates a raw inbound frame before decoding.
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

/// Validates a channel name at registration time.
pub fn validate_channel_name(channel: &str) -> Result<(), AppError> {
    if channel.is_empty() {
        return Err(AppError::validation("Channel can not be empty string"));
    }

    if channel.len() > MAX_CHANNEL_NAME_LEN {
        return Err(AppError::validation("Invalid channel name length"));
    }

    Ok(())
}

/// Validates a pair name sent by a client.
pub fn validate_pair(pair: &str) -> Result<(), AppError> {
    if pair.is_empty() || pair.len() > MAX_PAIR_LEN {
        return Err(AppError::validation("Invalid pair name length"));
    }

    if !pair
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | ':' | '.'))
    {
        return Err(AppError::validation("Pair name contains invalid characters"));
    }

    Ok(())
}
