//! Request field validation.
//!
//! Field checks run before the mutation guard, so malformed input is
//! rejected as `Validation` without spending a fact lookup.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ForgeError, Result};

/// Usernames: 3-32 chars, lowercase letters, digits, underscores, hyphens.
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]{3,32}$").expect("Invalid username regex"));

/// Email validation regex (RFC 5322 simplified).
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 4000;

pub fn validate_username(username: &str) -> Result<()> {
    if !USERNAME_REGEX.is_match(username) {
        return Err(ForgeError::validation(
            "username must be 3-32 characters: lowercase letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err(ForgeError::validation("email address is not valid"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ForgeError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Project/task/category display names.
pub fn validate_name(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ForgeError::validation(format!("{field} must not be empty")));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(ForgeError::validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(value: &str) -> Result<()> {
    if value.len() > MAX_DESCRIPTION_LEN {
        return Err(ForgeError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("team-lead_2").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Alice").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("name", "Sprint board").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"x".repeat(201)).is_err());
    }
}
