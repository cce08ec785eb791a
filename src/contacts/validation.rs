use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Minimum number of digits; spaces and hyphens are allowed but do not count.
const MIN_PHONE_DIGITS: usize = 10;

/// A single invalid form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Contact creation rejected. Carries every failing field so the caller can re-prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", render(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn render(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new(fields: Vec<FieldError>) -> Self {
        Self { fields }
    }

    /// Message for a given field, if it failed.
    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.message)
    }
}

/// Optional leading `+`, then digits, spaces and hyphens with at least ten digits.
fn is_valid_phone(phone: &str) -> bool {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    body.chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '-')
        && body.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

/// Validate the fields of a new contact.
pub fn validate_contact(name: &str, phone: &str) -> Result<(), ValidationError> {
    let mut fields = Vec::new();

    if name.trim().is_empty() {
        fields.push(FieldError::new("name", "Name is required"));
    }

    if phone.is_empty() {
        fields.push(FieldError::new("phone", "Phone is required"));
    } else if !is_valid_phone(phone) {
        fields.push(FieldError::new("phone", "Enter a valid phone number"));
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(fields))
    }
}
