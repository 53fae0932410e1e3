//! Small helpers for credential validation and normalization.

use crate::api::error::ApiError;
use regex::Regex;

/// Minimum accepted password length.
pub(crate) const MIN_PASSWORD_LEN: usize = 6;

/// Normalize a username or email for lookup/uniqueness checks.
///
/// Signup and login must agree on case handling, so both go through here.
pub(crate) fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Require a non-blank field, returning its trimmed value.
pub(crate) fn required_field(name: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput(format!("{name} is required")));
    }
    Ok(trimmed.to_string())
}

/// Enforce the password strength rule.
pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidInput(format!(
            "Password must include {MIN_PASSWORD_LEN} or more characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_identifier_trims_and_lowercases() {
        assert_eq!(normalize_identifier(" Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_identifier("AliceDoe "), "alicedoe");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("spaces in@example.com"));
    }

    #[test]
    fn required_field_rejects_blank() {
        assert!(required_field("username", "   ").is_err());
        assert_eq!(
            required_field("username", " alice ").ok(),
            Some("alice".to_string())
        );
    }

    #[test]
    fn validate_password_enforces_min_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("secret1").is_ok());
    }
}
