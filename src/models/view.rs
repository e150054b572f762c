//! What the presentation layer renders for a given `AuthState`.

use serde::Serialize;

use super::auth_state::AuthState;

/// The three mutually exclusive views of the login page.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthView {
    Loading,
    Unauthenticated,
    Authenticated { display_name: String },
}

impl From<&AuthState> for AuthView {
    fn from(state: &AuthState) -> Self {
        if state.is_loading() {
            return AuthView::Loading;
        }
        match state.user() {
            Some(user) => AuthView::Authenticated {
                display_name: user.display_name().to_string(),
            },
            None => AuthView::Unauthenticated,
        }
    }
}

/// A view plus the error banner, shown independently of the view.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub view: AuthView,
    pub error: Option<String>,
}

impl From<&AuthState> for ViewModel {
    fn from(state: &AuthState) -> Self {
        ViewModel {
            view: AuthView::from(state),
            error: state.error().map(str::to_string),
        }
    }
}
