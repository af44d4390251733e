use serde::{Deserialize, Serialize};

use evax_core::{DomainError, DomainResult};

/// Trim a required text field, rejecting blanks.
pub fn require_text(field: &str, value: impl AsRef<str>) -> DomainResult<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Reject a blank secret without altering it; surrounding spaces are part of
/// the secret.
pub fn require_secret<'a>(field: &str, value: &'a str) -> DomainResult<&'a str> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Emails are matched case-insensitively; store them trimmed and lower-cased.
pub fn normalize_email(raw: impl AsRef<str>) -> DomainResult<String> {
    let email = require_text("email", raw)?.to_lowercase();
    if !email.contains('@') {
        return Err(DomainError::validation("email is not a valid address"));
    }
    Ok(email)
}

/// Name, email and phone shared by administrator and staff accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

impl ContactDetails {
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
        phone_number: impl AsRef<str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: require_text("name", name)?,
            email: normalize_email(email)?,
            phone_number: require_text("phone_number", phone_number)?,
        })
    }
}
