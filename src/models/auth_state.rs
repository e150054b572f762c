//! The observable authentication state.
//!
//! `AuthState` is immutable from the outside: every transition builds a new
//! value, so a reader always sees `session` and `user` from the same write.

use super::session::Session;
use super::user::User;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    loading: bool,
    session: Option<Session>,
    error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    /// The state before the initial session fetch has resolved.
    pub fn new() -> Self {
        AuthState {
            loading: true,
            session: None,
            error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The signed-in user. Always derived from the session, never stored.
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Result of the bootstrap fetch: the whole state is replaced.
    pub fn bootstrapped(result: Result<Option<Session>, String>) -> Self {
        match result {
            Ok(session) => AuthState {
                loading: false,
                session,
                error: None,
            },
            Err(message) => AuthState {
                loading: false,
                session: None,
                error: Some(message),
            },
        }
    }

    /// The bootstrap fetch resolved after a provider push already set the
    /// session; only the loading flag is settled.
    pub fn bootstrap_superseded(&self) -> Self {
        AuthState {
            loading: false,
            ..self.clone()
        }
    }

    /// A provider push. Loading is left alone.
    pub fn with_session(&self, session: Option<Session>) -> Self {
        AuthState {
            loading: self.loading,
            session,
            error: None,
        }
    }

    /// Start of a user-initiated operation.
    pub fn operation_started(&self) -> Self {
        AuthState {
            loading: true,
            session: self.session.clone(),
            error: None,
        }
    }

    /// The OAuth sign-in was handed off to the provider.
    pub fn login_initiated(&self) -> Self {
        AuthState {
            loading: false,
            ..self.clone()
        }
    }

    pub fn login_failed(&self, message: String) -> Self {
        AuthState {
            loading: false,
            session: self.session.clone(),
            error: Some(message),
        }
    }

    /// Local state is cleared whether or not the provider accepted the
    /// sign-out.
    pub fn logged_out(error: Option<String>) -> Self {
        AuthState {
            loading: false,
            session: None,
            error,
        }
    }
}
