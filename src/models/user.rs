use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Provider-side metadata attached to a user, e.g. which OAuth provider
/// they signed in with.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AppMetadata {
    #[serde(default)]
    pub provider: Option<String>,
}

/// The identity handle carried inside a `Session`.
///
/// Only `id` is guaranteed; everything else depends on what the identity
/// provider returned for the account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,
}

impl User {
    /// Create a new `User` with an optional e-mail and no metadata.
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        User {
            id: id.into(),
            email,
            app_metadata: AppMetadata::default(),
            user_metadata: HashMap::new(),
        }
    }

    /// The label shown for a signed-in user: the e-mail, or the id when the
    /// provider did not share one.
    pub fn display_name(&self) -> &str {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ => &self.id,
        }
    }

    pub fn full_name(&self) -> Option<&str> {
        self.metadata_str("full_name")
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.metadata_str("avatar_url")
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_email() {
        let user = User::new("42", Some("ada@example.com".to_string()));
        assert_eq!(user.display_name(), "ada@example.com");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(User::new("42", None).display_name(), "42");
        assert_eq!(User::new("42", Some(String::new())).display_name(), "42");
    }

    #[test]
    fn deserializes_provider_payload() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "8c1d",
            "email": "ada@example.com",
            "app_metadata": { "provider": "github", "providers": ["github"] },
            "user_metadata": { "full_name": "Ada Lovelace", "avatar_url": "", "iss": "https://api.github.com" },
            "aud": "authenticated"
        }))
        .expect("user payload should deserialize");

        assert_eq!(user.id, "8c1d");
        assert_eq!(user.app_metadata.provider.as_deref(), Some("github"));
        assert_eq!(user.full_name(), Some("Ada Lovelace"));
        assert_eq!(user.avatar_url(), None);
    }
}
