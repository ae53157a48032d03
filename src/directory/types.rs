//! Wire types for the user-directory service.
//!
//! These mirror the directory's REST contract only; what the service does
//! with the records internally is its own business.

use serde::{Deserialize, Serialize};

/// Result of creating a new identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUser {
    pub uid: String,
    pub email: String,
}

/// A child entry nested inside a parent's profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

/// A parent's profile document as stored in the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentProfile {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub children: Vec<ChildProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Response envelope for profile listings.
#[derive(Debug, Deserialize)]
pub struct ProfileListing {
    pub documents: Vec<ParentProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserializes_with_missing_optionals() {
        let json = r#"{"uid": "u1", "email": "a@b.c", "name": "Alice", "role": "parent"}"#;
        let profile: ParentProfile = serde_json::from_str(json).unwrap();
        assert!(profile.children.is_empty());
        assert!(profile.created_at.is_none());
    }

    #[test]
    fn test_child_pin_round_trips() {
        let child = ChildProfile {
            name: "Sam".to_string(),
            pin: Some("1234".to_string()),
        };
        let json = serde_json::to_string(&child).unwrap();
        assert!(json.contains("1234"));

        let no_pin = ChildProfile { name: "Kim".to_string(), pin: None };
        let json = serde_json::to_string(&no_pin).unwrap();
        assert!(!json.contains("pin"));
    }
}
