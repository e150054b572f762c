//! The session coordinator: owns the `AuthState` and keeps it in step with
//! the identity provider.
//!
//! State lives in a `tokio::sync::watch` channel. Every transition is a
//! whole-value replace done under the channel's lock, so receivers never see
//! a half-applied update.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{AuthState, Session, ViewModel};
use crate::providers::{
    AuthChangeListener, IdentityProvider, OAuthConfig, OAuthRedirect, Subscription,
};

pub struct SessionCoordinator {
    provider: Arc<dyn IdentityProvider>,
    oauth: OAuthConfig,
    state: Arc<watch::Sender<AuthState>>,
    /// Number of provider pushes applied so far.
    pushes: Arc<AtomicU64>,
    initialized: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionCoordinator {
    pub fn new(provider: Arc<dyn IdentityProvider>, oauth: OAuthConfig) -> Self {
        let (state, _) = watch::channel(AuthState::new());
        SessionCoordinator {
            provider,
            oauth,
            state: Arc::new(state),
            pushes: Arc::new(AtomicU64::new(0)),
            initialized: AtomicBool::new(false),
            subscription: Mutex::new(None),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state replacement.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn view(&self) -> ViewModel {
        ViewModel::from(&*self.state.borrow())
    }

    /// Subscribe to provider pushes, then bootstrap from the provider's
    /// current session. Only the first call has an effect.
    ///
    /// Pushes that arrive while the fetch is pending win over the fetched
    /// value: once subscribed, the push stream is authoritative.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!(
                event_name = "coordinator.initialize.repeated",
                event_domain = "coordinator",
                provider_name = self.provider.get_name(),
                "coordinator already initialized, ignoring"
            );
            return;
        }

        let pushes_before = self.pushes.load(Ordering::SeqCst);
        let subscription = self
            .provider
            .on_auth_state_change(self.push_listener());
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);

        let result = self.provider.get_session().await;

        self.state.send_modify(|state| {
            if self.pushes.load(Ordering::SeqCst) != pushes_before {
                debug!(
                    event_name = "coordinator.initialize.superseded",
                    event_domain = "coordinator",
                    fetch_ok = result.is_ok(),
                    "provider push arrived before the initial fetch resolved, keeping pushed session"
                );
                *state = state.bootstrap_superseded();
                return;
            }
            *state = AuthState::bootstrapped(result.as_ref().cloned().map_err(|e| e.to_string()));
        });

        match &result {
            Ok(session) => info!(
                event_name = "coordinator.initialize.completed",
                event_domain = "coordinator",
                provider_name = self.provider.get_name(),
                signed_in = session.is_some(),
                "initial session fetched"
            ),
            Err(e) => warn!(
                event_name = "coordinator.initialize.failed",
                event_domain = "coordinator",
                provider_name = self.provider.get_name(),
                error = %e,
                "initial session fetch failed"
            ),
        }
    }

    /// Apply a session change pushed by the provider.
    pub fn on_provider_state_change(&self, session: Option<Session>) {
        apply_push(&self.state, &self.pushes, session);
    }

    /// Start an OAuth sign-in. Returns where the user agent must navigate,
    /// or `None` if the sign-in could not be initiated (see `state().error()`).
    pub async fn login(&self) -> Option<OAuthRedirect> {
        self.begin_operation("login");

        match self.provider.sign_in_with_oauth(&self.oauth).await {
            Ok(redirect) => {
                self.state.send_modify(|state| *state = state.login_initiated());
                info!(
                    event_name = "coordinator.login.initiated",
                    event_domain = "coordinator",
                    oauth_provider = self.oauth.provider.as_str(),
                    "login handed off to identity provider"
                );
                Some(redirect)
            }
            Err(e) => {
                warn!(
                    event_name = "coordinator.login.failed",
                    event_domain = "coordinator",
                    oauth_provider = self.oauth.provider.as_str(),
                    error = %e,
                    "could not initiate login"
                );
                let message = e.to_string();
                self.state
                    .send_modify(|state| *state = state.login_failed(message));
                None
            }
        }
    }

    /// Sign out. Local state is cleared even when the provider call fails.
    pub async fn logout(&self) {
        self.begin_operation("logout");

        let error = match self.provider.sign_out().await {
            Ok(()) => {
                info!(
                    event_name = "coordinator.logout.completed",
                    event_domain = "coordinator",
                    "signed out"
                );
                None
            }
            Err(e) => {
                warn!(
                    event_name = "coordinator.logout.failed",
                    event_domain = "coordinator",
                    error = %e,
                    "provider sign-out failed, clearing local session anyway"
                );
                Some(e.to_string())
            }
        };
        self.state.send_replace(AuthState::logged_out(error));
    }

    /// Ask the provider who the current user is and log it. Never touches
    /// the state.
    pub async fn check_user(&self) {
        match self.provider.get_user().await {
            Ok(user) => debug!(
                event_name = "coordinator.check_user",
                event_domain = "coordinator",
                user = ?user,
                "provider user check"
            ),
            Err(e) => warn!(
                event_name = "coordinator.check_user.failed",
                event_domain = "coordinator",
                error = %e,
                "provider user check failed"
            ),
        }
    }

    /// Release the provider subscription. Safe to call more than once.
    pub fn shutdown(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            info!(
                event_name = "coordinator.shutdown",
                event_domain = "coordinator",
                subscription_id = %subscription.id(),
                "releasing provider subscription"
            );
            subscription.unsubscribe();
        }
    }

    fn begin_operation(&self, operation: &str) {
        self.state.send_modify(|state| {
            // Concurrent invocations are not deduplicated.
            if state.is_loading() {
                debug!(
                    event_name = "coordinator.operation.overlap",
                    event_domain = "coordinator",
                    operation,
                    "operation started while another is in flight"
                );
            }
            *state = state.operation_started();
        });
    }

    fn push_listener(&self) -> AuthChangeListener {
        let state = self.state.clone();
        let pushes = self.pushes.clone();
        Arc::new(move |session: Option<Session>| apply_push(&state, &pushes, session))
    }
}

fn apply_push(state: &watch::Sender<AuthState>, pushes: &AtomicU64, session: Option<Session>) {
    state.send_modify(|current| {
        pushes.fetch_add(1, Ordering::SeqCst);
        debug!(
            event_name = "coordinator.push",
            event_domain = "coordinator",
            signed_in = session.is_some(),
            "provider pushed a session change"
        );
        *current = current.with_session(session);
    });
}
