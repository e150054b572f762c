//! HTTP route definitions and handlers.
//!
//! The routes are a thin presentation adapter over the session coordinator:
//! they render its state and expose `login`/`logout` as the only actions.

mod health_routes;
mod session_routes;

use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(session_routes::routes())
        .merge(health_routes::routes())
        .with_state(state)
}
