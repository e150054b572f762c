use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::gotrue_provider::{GoTrueProvider, GoTrueProviderConfig};
use super::listeners::{AuthChangeListener, Subscription};
use crate::models::{Session, User};

/// Configuration options for the identity provider backing the coordinator.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "gotrue")]
    GoTrue(GoTrueProviderConfig),
}

/// Which OAuth provider to sign in with and where the provider should send
/// the browser back to afterwards.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub provider: String,
    pub redirect_target: String,
}

/// Where the user agent has to navigate to continue an OAuth sign-in.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub url: String,
}

/// Tokens delivered back to `redirect_target` once the user approved the
/// OAuth sign-in.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RedirectTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Failures reported by an identity provider. The `Display` output is the
/// message surfaced to the user.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("invalid response from identity provider: {0}")]
    Decode(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Other(String),
}

/// The capability set the session coordinator needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// A descriptive name for logs.
    fn get_name(&self) -> &str;

    /// The session the provider currently considers active, if any.
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Fetch the current user from the provider. Diagnostic only.
    async fn get_user(&self) -> Result<Option<User>, ProviderError>;

    /// Register a listener for session changes. The listener stays
    /// registered until the returned `Subscription` is released.
    fn on_auth_state_change(&self, listener: AuthChangeListener) -> Subscription;

    /// Start an OAuth sign-in, returning where the user agent must go next.
    async fn sign_in_with_oauth(&self, config: &OAuthConfig)
        -> Result<OAuthRedirect, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Adopt the tokens an OAuth redirect delivered and announce the new
    /// session to listeners. Providers that finish sign-in on their own keep
    /// the default, which refuses.
    async fn set_session(&self, _tokens: &RedirectTokens) -> Result<Session, ProviderError> {
        Err(ProviderError::InvalidRequest(format!(
            "Provider '{}' does not accept redirect tokens",
            self.get_name()
        )))
    }
}

/// Create an identity provider from a given config.
pub fn create_identity_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn IdentityProvider>, ProviderError> {
    match config {
        ProviderConfig::GoTrue(cfg) => Ok(Arc::new(GoTrueProvider::new(cfg)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::{
        providers::{Format, Yaml},
        Figment,
    };

    #[test]
    fn provider_config_is_tagged_by_type() {
        let yaml = r#"
type: gotrue
name: supabase
url: https://example.supabase.co/auth/v1
api_key: anon
"#;
        let config: ProviderConfig = Figment::new()
            .merge(Yaml::string(yaml))
            .extract()
            .expect("provider config should parse");

        let ProviderConfig::GoTrue(cfg) = config;
        assert_eq!(cfg.name, "supabase");
        assert_eq!(cfg.timeout_in_ms, 5000);
    }

    #[test]
    fn unknown_provider_type_is_rejected() {
        let yaml = "type: carrier-pigeon\nname: x\n";
        let result: Result<ProviderConfig, _> =
            Figment::new().merge(Yaml::string(yaml)).extract();
        assert!(result.is_err());
    }

    #[test]
    fn error_messages_are_user_facing() {
        let err = ProviderError::Api {
            status: 400,
            message: "Unsupported provider: provider is not enabled".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported provider: provider is not enabled"
        );
        assert_eq!(
            ProviderError::Other("network down".to_string()).to_string(),
            "network down"
        );
    }
}
