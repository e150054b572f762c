use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::base::{IdentityProvider, OAuthConfig, OAuthRedirect, ProviderError, RedirectTokens};
use super::listeners::{AuthChangeListener, ListenerRegistry, Subscription};
use crate::models::{Session, User};

fn default_timeout_in_ms() -> u64 {
    5000
}

/// The config needed to talk to a GoTrue (Supabase Auth) API.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct GoTrueProviderConfig {
    /// A friendly name for logs.
    pub name: String,
    /// Base URL of the auth API, e.g. `https://<project>.supabase.co/auth/v1`.
    pub url: String,
    /// The public (anon) key, sent as the `apikey` header.
    pub api_key: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

/// A provider backed by the GoTrue REST API.
///
/// The session lives in memory only; it is adopted through
/// `IdentityProvider::set_session` once the OAuth redirect has delivered
/// tokens.
pub struct GoTrueProvider {
    config: GoTrueProviderConfig,
    base_url: String,
    client: reqwest::Client,
    session: RwLock<Option<Session>>,
    listeners: ListenerRegistry,
}

impl GoTrueProvider {
    pub fn new(config: &GoTrueProviderConfig) -> Result<Self, ProviderError> {
        info!(
            event_name = "providers.gotrue.created",
            event_domain = "providers",
            provider_name = config.name.as_str(),
            url = config.url.as_str(),
            timeout_in_ms = config.timeout_in_ms,
            "creating GoTrue provider"
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()?;

        Ok(Self {
            config: config.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
            session: RwLock::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    fn replace_session(&self, session: Option<Session>) -> Option<Session> {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, session)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<User, ProviderError> {
        let url = format!("{}/user", self.base_url);
        debug!("Sending GoTrue user request to: {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Turn a non-2xx response into an `Api` error, preferring the message the
/// API put in its JSON body.
async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let from_json = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
        ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    let message = from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("Unexpected status code: {}", status));

    warn!(
        event_name = "providers.gotrue.api_error",
        event_domain = "providers",
        status = status.as_u16(),
        error_message = message.as_str(),
        "GoTrue API returned an error"
    );
    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    fn get_name(&self) -> &str {
        &self.config.name
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let expired = {
            let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
            if !guard.as_ref().is_some_and(Session::is_expired) {
                return Ok(guard.clone());
            }
            guard.take()
        };

        if let Some(session) = expired {
            info!(
                event_name = "providers.gotrue.session_expired",
                event_domain = "providers",
                provider_name = self.config.name.as_str(),
                user_id = session.user.id.as_str(),
                "held session expired, dropping it"
            );
            self.listeners.notify(None);
        }
        Ok(None)
    }

    async fn get_user(&self) -> Result<Option<User>, ProviderError> {
        // An expired session is dropped here rather than sent to /user.
        match self.get_session().await? {
            Some(session) => self.fetch_user(&session.access_token).await.map(Some),
            None => Ok(None),
        }
    }

    fn on_auth_state_change(&self, listener: AuthChangeListener) -> Subscription {
        self.listeners.register(listener)
    }

    async fn sign_in_with_oauth(
        &self,
        config: &OAuthConfig,
    ) -> Result<OAuthRedirect, ProviderError> {
        if config.provider.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "No OAuth provider configured".to_string(),
            ));
        }

        let mut params = vec![("provider", config.provider.as_str())];
        if !config.redirect_target.is_empty() {
            params.push(("redirect_to", config.redirect_target.as_str()));
        }
        let url = reqwest::Url::parse_with_params(&format!("{}/authorize", self.base_url), &params)
            .map_err(|e| ProviderError::InvalidRequest(format!("Invalid authorize URL: {}", e)))?;

        info!(
            event_name = "providers.gotrue.oauth_started",
            event_domain = "providers",
            provider_name = self.config.name.as_str(),
            oauth_provider = config.provider.as_str(),
            "OAuth sign-in initiated"
        );
        Ok(OAuthRedirect {
            url: url.to_string(),
        })
    }

    async fn set_session(&self, tokens: &RedirectTokens) -> Result<Session, ProviderError> {
        let user = self.fetch_user(&tokens.access_token).await?;
        let mut session = Session::new(tokens.access_token.as_str(), user)
            .with_refresh_token(tokens.refresh_token.clone());
        if let Some(seconds) = tokens.expires_in {
            session = session.expiring_in(seconds);
        }

        self.replace_session(Some(session.clone()));
        info!(
            event_name = "providers.gotrue.signed_in",
            event_domain = "providers",
            provider_name = self.config.name.as_str(),
            user_id = session.user.id.as_str(),
            "session adopted from OAuth redirect"
        );
        self.listeners.notify(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let Some(session) = self.replace_session(None) else {
            debug!("No session held, nothing to sign out");
            return Ok(());
        };
        self.listeners.notify(None);

        let url = format!("{}/logout", self.base_url);
        debug!("Sending GoTrue logout request to: {}", url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        let status = response.status();
        // 401/403/404 mean the session is already gone on the provider side.
        if status.is_success() || matches!(status.as_u16(), 401 | 403 | 404) {
            info!(
                event_name = "providers.gotrue.signed_out",
                event_domain = "providers",
                provider_name = self.config.name.as_str(),
                user_id = session.user.id.as_str(),
                status = status.as_u16(),
                "session signed out"
            );
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }
}
