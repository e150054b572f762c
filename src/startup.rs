//! Application startup and server initialization.
//!
//! Builds the identity provider and the session coordinator, bootstraps the
//! session, and serves the HTTP adapter until ctrl-c.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ConfigV1;
use crate::coordinator::SessionCoordinator;
use crate::providers::create_identity_provider;
use crate::routes;
use crate::state::AppState;

/// Initializes and runs the application server.
///
/// The provider subscription is released once the server stops, whether it
/// stopped cleanly or not.
///
/// # Errors
///
/// Returns an error if the provider cannot be created, the server fails to
/// bind to the configured address, or serving fails.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let provider = create_identity_provider(&config.provider)?;
    let coordinator = Arc::new(SessionCoordinator::new(
        provider.clone(),
        config.login.clone(),
    ));

    coordinator.initialize().await;
    coordinator.check_user().await;

    let state = AppState {
        config: config.clone(),
        coordinator: coordinator.clone(),
        provider,
    };
    let app = routes::create_router(state);

    info!("Starting server on {}", config.bind_address);
    let served = match TcpListener::bind(&config.bind_address).await {
        Ok(listener) => axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await,
        Err(e) => Err(e),
    };

    coordinator.shutdown();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for ctrl-c, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
