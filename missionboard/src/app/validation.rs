//! Input validation shared by the services.

use crate::error::{MissionBoardError, Result};

/// Validate email address format.
///
/// Basic checks only:
/// - exactly one `@`
/// - non-empty local and domain parts, the domain containing a dot
/// - between 3 and 255 characters
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local_chars)
        && domain.chars().all(valid_domain_chars)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

/// Trim and lowercase an email, rejecting malformed addresses.
///
/// # Errors
///
/// Returns [`MissionBoardError::Validation`] if the address is malformed.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(MissionBoardError::validation(format!(
            "Invalid email address: {email}"
        )))
    }
}

/// Trim a required text field, rejecting empty or over-long values.
///
/// # Errors
///
/// Returns [`MissionBoardError::Validation`] if the value is blank or longer
/// than `max_chars` characters.
pub fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MissionBoardError::validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.chars().count() > max_chars {
        return Err(MissionBoardError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}

/// Uppercase a three-letter ISO 4217 currency code.
///
/// # Errors
///
/// Returns [`MissionBoardError::Validation`] unless the code is three ASCII
/// letters.
pub fn normalize_currency(currency: &str) -> Result<String> {
    let currency = currency.trim();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(currency.to_ascii_uppercase())
    } else {
        Err(MissionBoardError::validation(format!(
            "Invalid currency code: {currency}"
        )))
    }
}

/// Drop blank optional text.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
