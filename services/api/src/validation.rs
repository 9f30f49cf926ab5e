//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 30 {
        return Err("Username must be at most 30 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores".to_string());
    }

    Ok(())
}

/// Validate a person name (first or last)
pub fn validate_name(name: &str, field: &str) -> Result<(), String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(format!("{} is required", field));
    }

    if name.chars().count() > 50 {
        return Err(format!("{} must be at most 50 characters long", field));
    }

    Ok(())
}

/// Validate phone number
pub fn validate_phone_number(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^\+?[0-9\s\-()]{7,20}$").expect("Failed to compile phone regex")
    });

    if !regex.is_match(phone) {
        return Err("Invalid phone number format".to_string());
    }

    Ok(())
}

/// Validate bounded free-text content
pub fn validate_content(content: &str, field: &str, max_len: usize) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err(format!("{} cannot be empty", field));
    }

    // Limits are in characters, so multi-byte text is not penalized
    if content.chars().count() > max_len {
        return Err(format!(
            "{} cannot exceed {} characters",
            field, max_len
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.example.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dash-ed").is_err());
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+1 (555) 123-4567").is_ok());
        assert!(validate_phone_number("5551234567").is_ok());
        assert!(validate_phone_number("abc").is_err());
        assert!(validate_phone_number("").is_err());
    }

    #[test]
    fn test_validate_content_length() {
        assert!(validate_content("hello", "Post content", 10).is_ok());
        assert!(validate_content("   ", "Post content", 10).is_err());
        assert!(validate_content("toolongvalue", "Post content", 5).is_err());
    }

    #[test]
    fn test_validate_content_counts_characters_not_bytes() {
        // five multi-byte characters, fifteen bytes
        assert!(validate_content("こんにちは", "Comment", 5).is_ok());
        assert!(validate_content("こんにちは!", "Comment", 5).is_err());
    }
}
