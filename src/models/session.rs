use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::user::User;

/// An authenticated session as handed out by the identity provider.
///
/// The coordinator treats it as opaque apart from the embedded `user`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is no longer valid.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Session {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            expires_at: None,
            user,
        }
    }

    /// Set `expires_at` from a relative lifetime in seconds.
    pub fn expiring_in(mut self, seconds: i64) -> Self {
        self.expires_at = Some(Utc::now().timestamp() + seconds);
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}
