use crate::error::{NotifyError, Result};

/// Basic email validation
pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(NotifyError::InvalidEmail("Email is empty".to_string()));
    }

    if !email.contains('@') {
        return Err(NotifyError::InvalidEmail(
            "Email must contain @".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(NotifyError::InvalidEmail("Invalid email format".to_string()));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(NotifyError::InvalidEmail(
            "Email parts cannot be empty".to_string(),
        ));
    }

    if !domain.contains('.') {
        return Err(NotifyError::InvalidEmail(
            "Domain must contain a dot".to_string(),
        ));
    }

    if email.contains(char::is_whitespace) {
        return Err(NotifyError::InvalidEmail(
            "Email cannot contain whitespace".to_string(),
        ));
    }

    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    validate_email(email).is_ok()
}

/// Parse a free-text, comma-separated address list. Entries are trimmed and
/// invalid ones silently dropped rather than failing the whole send.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| is_valid_email(s))
        .map(|s| s.to_string())
        .collect()
}
