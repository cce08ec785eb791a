use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ContactId = Uuid;

/// How a contact relates to the user.
///
/// The known values come from the contact form; anything else is kept as free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Relationship {
    Mother,
    Father,
    Sibling,
    Spouse,
    #[default]
    Friend,
    Colleague,
    Other,
    Custom(String),
}

impl Relationship {
    pub fn as_str(&self) -> &str {
        match self {
            Relationship::Mother => "Mother",
            Relationship::Father => "Father",
            Relationship::Sibling => "Sibling",
            Relationship::Spouse => "Spouse",
            Relationship::Friend => "Friend",
            Relationship::Colleague => "Colleague",
            Relationship::Other => "Other",
            Relationship::Custom(s) => s,
        }
    }
}

impl FromStr for Relationship {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "" | "friend" => Relationship::Friend,
            "mother" => Relationship::Mother,
            "father" => Relationship::Father,
            "sibling" => Relationship::Sibling,
            "spouse" => Relationship::Spouse,
            "colleague" => Relationship::Colleague,
            "other" => Relationship::Other,
            _ => Relationship::Custom(trimmed.to_string()),
        })
    }
}

impl From<&str> for Relationship {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(r) => r,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// Serialized as the plain label so stored data stays readable
impl Serialize for Relationship {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Relationship {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Relationship::from(s.as_str()))
    }
}

/// A trusted contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    id: ContactId,
    pub name: String,
    pub phone: String,
    pub relationship: Relationship,
    pub is_emergency: bool,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// New non-emergency contact with a fresh id. Inputs are assumed validated.
    pub(crate) fn new(name: String, phone: String, relationship: Relationship) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            phone,
            relationship,
            is_emergency: false,
            created_at: Utc::now(),
        }
    }

    /// Immutable identifier assigned at creation.
    pub fn id(&self) -> ContactId {
        self.id
    }

    /// Phone number with whitespace and hyphens removed, suitable for dialing.
    pub fn dial_string(&self) -> String {
        self.phone
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_parse_known_case_insensitive() {
        assert_eq!(Relationship::from("mother"), Relationship::Mother);
        assert_eq!(Relationship::from("COLLEAGUE"), Relationship::Colleague);
        assert_eq!(Relationship::from("  Spouse "), Relationship::Spouse);
    }

    #[test]
    fn test_relationship_free_text() {
        let r = Relationship::from("Neighbour");
        assert_eq!(r, Relationship::Custom("Neighbour".to_string()));
        assert_eq!(r.to_string(), "Neighbour");
    }

    #[test]
    fn test_relationship_defaults_to_friend() {
        assert_eq!(Relationship::from(""), Relationship::Friend);
        assert_eq!(Relationship::default(), Relationship::Friend);
    }

    #[test]
    fn test_contact_serializes_camel_case() {
        let contact = Contact::new(
            "Mom".to_string(),
            "+91 99999-99999".to_string(),
            Relationship::Mother,
        );
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["isEmergency"], serde_json::json!(false));
        assert_eq!(json["relationship"], serde_json::json!("Mother"));
        assert_eq!(contact.dial_string(), "+919999999999");
    }
}
