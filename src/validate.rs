use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed email, or a 400. Case is kept as given.
pub fn email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim();
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    Ok(email.to_string())
}

pub fn password(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Trimmed name of at least `min_len` characters.
pub fn name(raw: &str, min_len: usize) -> Result<String, AppError> {
    let name = raw.trim();
    if name.chars().count() < min_len.max(1) {
        return Err(AppError::Validation(format!(
            "Name must be at least {} characters long",
            min_len.max(1)
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_case_preserved() {
        assert_eq!(email("  Alice@X.com ").unwrap(), "Alice@X.com");
        assert!(email("alice").is_err());
        assert!(email("alice@x").is_err());
        assert!(email("a b@x.com").is_err());
    }

    #[test]
    fn password_needs_eight_characters() {
        assert!(password("pw123456").is_ok());
        assert!(password("short").is_err());
        assert!(password("").is_err());
    }

    #[test]
    fn name_rules() {
        assert_eq!(name("  Alice ", 1).unwrap(), "Alice");
        assert!(name("   ", 1).is_err());
        assert!(name("A", 2).is_err());
    }
}
