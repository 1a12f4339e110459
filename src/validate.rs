//! Required-field and length checks shared by the CLI and the TUI forms.
//!
//! The stores trust their input; every front end runs these before calling
//! a store operation.

use crate::error::{DeskError, Result};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Trimmed value of a field that must not be blank.
pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DeskError::required(field));
    }
    Ok(trimmed)
}

fn within_length(field: &str, value: &str, max: usize) -> Result<()> {
    let actual = value.chars().count();
    if actual > max {
        return Err(DeskError::Other(format!(
            "{field} is too long ({actual} characters, max {max})"
        )));
    }
    Ok(())
}

/// Titles are single-line and bounded.
pub fn title(value: &str) -> Result<&str> {
    let value = required("title", value)?;
    within_length("title", value, MAX_TITLE_LENGTH)?;
    if value.chars().any(char::is_control) {
        return Err(DeskError::Other(
            "title cannot contain control characters".to_string(),
        ));
    }
    Ok(value)
}

pub fn description(value: &str) -> Result<&str> {
    let value = required("description", value)?;
    within_length("description", value, MAX_TEXT_LENGTH)?;
    Ok(value)
}

pub fn comment(value: &str) -> Result<&str> {
    let value = required("comment", value)?;
    within_length("comment", value, MAX_TEXT_LENGTH)?;
    Ok(value)
}

/// Credentials: email must look like an address, password must be present.
pub fn credentials<'a>(email: &'a str, password: &'a str) -> Result<(&'a str, &'a str)> {
    let email = required("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => {
            return Err(DeskError::Auth(format!(
                "'{email}' is not a valid email address"
            )));
        }
    }
    if password.is_empty() {
        return Err(DeskError::required("password"));
    }
    Ok((email, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("title", "  Printer  ").unwrap(), "Printer");
        assert_eq!(
            required("title", "   ").unwrap_err().to_string(),
            "title is required"
        );
    }

    #[test]
    fn test_title_rules() {
        assert!(title("VPN down").is_ok());
        assert!(title("line\nbreak").is_err());
        assert!(title(&"x".repeat(MAX_TITLE_LENGTH + 1)).is_err());
        assert!(title(&"é".repeat(MAX_TITLE_LENGTH)).is_ok());
    }

    #[test]
    fn test_description_allows_newlines() {
        assert_eq!(description("a\nb").unwrap(), "a\nb");
        assert!(description("").is_err());
    }

    #[test]
    fn test_credentials() {
        assert!(credentials("user@example.com", "password123").is_ok());
        assert!(matches!(
            credentials("user", "pw"),
            Err(DeskError::Auth(_))
        ));
        assert!(matches!(
            credentials("user@example.com", ""),
            Err(DeskError::Validation { .. })
        ));
        assert!(credentials("", "pw").is_err());
    }
}
