//! Shared application state.

use crate::config::ConfigV1;
use crate::coordinator::SessionCoordinator;
use crate::providers::IdentityProvider;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// The single coordinator owning the authentication state.
    pub coordinator: Arc<SessionCoordinator>,
    /// The provider the coordinator listens to; the OAuth callback hands
    /// redirect tokens to it directly.
    pub provider: Arc<dyn IdentityProvider>,
}
