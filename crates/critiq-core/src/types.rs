//! Data model: Identity and PublicationRecord.
//!
//! Both carry opaque fields owned by the UI. They are flattened into the
//! record on (de)serialization so they survive a read-filter-write pass
//! untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Locally cached representation of the logged-in user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Handle matched against `PublicationRecord::username`
    pub username_handle: String,

    /// Opaque profile fields
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Identity {
    pub fn new(username_handle: &str) -> Self {
        Self {
            username_handle: String::from(username_handle),
            profile: Map::new(),
        }
    }

    /// Attach an opaque profile field.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.profile.insert(String::from(key), value);
        self
    }
}

/// One user-authored publication held in the ephemeral store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Author handle. Compared with strict equality.
    pub username: String,

    /// Opaque content fields (title, body, rating, ...)
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl PublicationRecord {
    pub fn new(username: &str) -> Self {
        Self {
            username: String::from(username),
            content: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.content.insert(String::from(key), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_keeps_profile_fields() {
        let raw = r#"{"usernameHandle":"ana","displayName":"Ana","avatar":{"url":"a.png"}}"#;
        let identity: Identity = serde_json::from_str(raw).unwrap();
        assert_eq!(identity.username_handle, "ana");
        assert_eq!(identity.profile.get("displayName"), Some(&json!("Ana")));

        let back: Value = serde_json::to_value(&identity).unwrap();
        assert_eq!(back["avatar"]["url"], json!("a.png"));
        assert_eq!(back["usernameHandle"], json!("ana"));
    }

    #[test]
    fn test_identity_without_handle_is_malformed() {
        assert!(serde_json::from_str::<Identity>(r#"{"displayName":"Ana"}"#).is_err());
        assert!(serde_json::from_str::<Identity>("null").is_err());
    }

    #[test]
    fn test_publication_content_is_flattened() {
        let record = PublicationRecord::new("bob")
            .with_field("title", json!("Dune"))
            .with_field("rating", json!(4));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"username": "bob", "title": "Dune", "rating": 4}));
        assert_eq!(record.field("rating"), Some(&json!(4)));
    }
}
