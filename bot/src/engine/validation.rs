use crate::error::{Result, TreeError};

/// Validate a nickname. Must be non-empty; whitespace-only is allowed since
/// the chat server accepts it as a display name.
pub fn validate_nickname(nick: &str) -> Result<()> {
    if nick.is_empty() {
        return Err(TreeError::InvalidValue(
            "Cannot set a user's nickname to the empty string".into(),
        ));
    }
    Ok(())
}

/// Validate a background color token. Any non-empty token is accepted; the
/// diagram renderer decides how to interpret it.
pub fn validate_background_color(color: &str) -> Result<()> {
    if color.is_empty() {
        return Err(TreeError::InvalidValue(
            "Cannot set a user's background color to the empty string".into(),
        ));
    }
    Ok(())
}
