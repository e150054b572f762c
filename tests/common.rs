#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use authsync::config::{ConfigV1, LoggingConfig};
use authsync::coordinator::SessionCoordinator;
use authsync::models::{Session, User};
use authsync::providers::{
    AuthChangeListener, GoTrueProviderConfig, IdentityProvider, ListenerRegistry, OAuthConfig,
    OAuthRedirect, ProviderConfig, ProviderError, Subscription,
};
use authsync::routes::create_router;
use authsync::state::AppState;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use serde_json::Value;

/// An in-memory identity provider with scripted replies.
pub struct FakeProvider {
    pub listeners: ListenerRegistry,
    session: Mutex<Result<Option<Session>, String>>,
    sign_in: Mutex<Result<String, String>>,
    sign_out: Mutex<Result<(), String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider {
            listeners: ListenerRegistry::new(),
            session: Mutex::new(Ok(None)),
            sign_in: Mutex::new(Ok(
                "https://idp.example/authorize?provider=github".to_string()
            )),
            sign_out: Mutex::new(Ok(())),
        }
    }

    pub fn set_session_reply(&self, reply: Result<Option<Session>, String>) {
        *self.session.lock().unwrap() = reply;
    }

    pub fn set_sign_in(&self, reply: Result<String, String>) {
        *self.sign_in.lock().unwrap() = reply;
    }

    pub fn set_sign_out(&self, reply: Result<(), String>) {
        *self.sign_out.lock().unwrap() = reply;
    }

    /// Simulate a provider-side session change (token refresh, another tab, expiry).
    pub fn push(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = Ok(session.clone());
        self.listeners.notify(session);
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn get_name(&self) -> &str {
        "fake"
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.session
            .lock()
            .unwrap()
            .clone()
            .map_err(ProviderError::Other)
    }

    async fn get_user(&self) -> Result<Option<User>, ProviderError> {
        Ok(self.get_session().await?.map(|s| s.user))
    }

    fn on_auth_state_change(&self, listener: AuthChangeListener) -> Subscription {
        self.listeners.register(listener)
    }

    async fn sign_in_with_oauth(
        &self,
        _config: &OAuthConfig,
    ) -> Result<OAuthRedirect, ProviderError> {
        self.sign_in
            .lock()
            .unwrap()
            .clone()
            .map(|url| OAuthRedirect { url })
            .map_err(ProviderError::Other)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let reply = self.sign_out.lock().unwrap().clone();
        *self.session.lock().unwrap() = Ok(None);
        reply.map_err(ProviderError::Other)
    }
}

pub fn session(id: &str, email: Option<&str>) -> Session {
    Session::new(
        format!("token-{}", id),
        User::new(id, email.map(str::to_string)),
    )
}

pub fn test_config() -> ConfigV1 {
    ConfigV1 {
        bind_address: "127.0.0.1:0".to_string(),
        logging: LoggingConfig::default(),
        login: OAuthConfig {
            provider: "github".to_string(),
            redirect_target: "http://localhost:3000/callback".to_string(),
        },
        provider: ProviderConfig::GoTrue(GoTrueProviderConfig {
            name: "unused".to_string(),
            url: "http://127.0.0.1:9".to_string(),
            api_key: "anon".to_string(),
            timeout_in_ms: 1000,
        }),
    }
}

/// Build the router around an initialized coordinator backed by `provider`.
pub async fn build_app(provider: Arc<FakeProvider>) -> (Router, Arc<SessionCoordinator>) {
    build_app_with(provider).await
}

/// Same as `build_app`, for any provider implementation.
pub async fn build_app_with(
    provider: Arc<dyn IdentityProvider>,
) -> (Router, Arc<SessionCoordinator>) {
    let config = Arc::new(test_config());
    let coordinator = Arc::new(SessionCoordinator::new(
        provider.clone(),
        config.login.clone(),
    ));
    coordinator.initialize().await;

    let state = AppState {
        config,
        coordinator: coordinator.clone(),
        provider,
    };
    (create_router(state), coordinator)
}

pub fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
