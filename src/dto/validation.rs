//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted player name, counted in characters after trimming.
pub const MAX_PLAYER_NAME_CHARS: usize = 32;

/// Validates that a player name has 1 to 32 visible characters once trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Explorer")  // Ok
/// validate_player_name("   ")       // Err - blank
/// validate_player_name("a\tb")      // Err - control character
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_PLAYER_NAME_CHARS {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("player_name_format");
        err.message = Some("Player name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Explorer").is_ok());
        assert!(validate_player_name("  Zoë  ").is_ok());
        assert!(validate_player_name(&"é".repeat(MAX_PLAYER_NAME_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_player_name_invalid_length() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name(&"a".repeat(MAX_PLAYER_NAME_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_player_name_invalid_format() {
        assert!(validate_player_name("a\tb").is_err());
        assert!(validate_player_name("line\nbreak").is_err());
    }
}
