//! Session endpoints: the rendered auth state plus the login/logout actions.
//!
//! Failures of the coordinator operations never surface as HTTP errors; they
//! are part of the returned state, like any other field the page renders.
//! The OAuth callback is the exception: rejected redirect tokens answer 401.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{AuthState, AuthView, User};
use crate::providers::RedirectTokens;
use crate::state::AppState;

/// Registers session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/callback", get(callback))
}

#[derive(Serialize)]
struct SessionResponse {
    loading: bool,
    error: Option<String>,
    user: Option<User>,
    view: AuthView,
}

impl From<&AuthState> for SessionResponse {
    fn from(state: &AuthState) -> Self {
        SessionResponse {
            loading: state.is_loading(),
            error: state.error().map(str::to_string),
            user: state.user().cloned(),
            view: AuthView::from(state),
        }
    }
}

async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse::from(&state.coordinator.state()))
}

/// Redirects to the identity provider, or returns the state carrying the
/// error when the sign-in could not be started.
async fn login(State(state): State<AppState>) -> Response {
    match state.coordinator.login().await {
        Some(redirect) => {
            debug!("Redirecting to identity provider: {}", redirect.url);
            Redirect::to(&redirect.url).into_response()
        }
        None => Json(SessionResponse::from(&state.coordinator.state())).into_response(),
    }
}

async fn logout(State(state): State<AppState>) -> Json<SessionResponse> {
    state.coordinator.logout().await;
    Json(SessionResponse::from(&state.coordinator.state()))
}

/// Landing point of the OAuth redirect. The provider adopts the tokens and
/// pushes the new session, so the coordinator state returned here already
/// carries it.
async fn callback(
    State(state): State<AppState>,
    Query(tokens): Query<RedirectTokens>,
) -> Response {
    match state.provider.set_session(&tokens).await {
        Ok(_) => Json(SessionResponse::from(&state.coordinator.state())).into_response(),
        Err(e) => {
            warn!(
                event_name = "routes.callback.rejected",
                event_domain = "routes",
                provider_name = state.provider.get_name(),
                error = %e,
                "redirect tokens rejected"
            );
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}
