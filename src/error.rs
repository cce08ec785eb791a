use serde::Serialize;
use thiserror::Error;

use crate::contacts::ValidationError;

#[derive(Debug, Error)]
pub enum RakshaError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),
}

// Presentation layers receive errors as plain strings
impl Serialize for RakshaError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RakshaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::FieldError;

    #[test]
    fn test_validation_error_serializes_as_message() {
        let err = RakshaError::from(ValidationError::new(vec![FieldError::new(
            "name",
            "Name is required",
        )]));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!("Validation failed: name: Name is required"));
    }

    #[test]
    fn test_not_found_display() {
        let err = RakshaError::NotFound("contact abc".to_string());
        assert_eq!(err.to_string(), "Not found: contact abc");
    }
}
