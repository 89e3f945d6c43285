//! HTTP surface of the tag bot: `POST /webhook` and `GET /health`.

mod core;
mod error_handler;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use hosting_gateway::{GitLabClient, HostingGateway};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

pub use crate::core::app_state::{AppState, Settings};
pub use crate::error_handler::{AppError, AppResult, ConfigError};
use crate::routes::{health_route::health, webhook_route::webhook};

/// Upper bound on a webhook body; above axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Builds the GitLab client, binds `settings.api_address` and serves until Ctrl+C.
pub async fn start(settings: Settings) -> AppResult<()> {
    let gateway = GitLabClient::from_config(settings.provider_config()).map_err(AppError::Gateway)?;
    let state = Arc::new(AppState::new(&settings.tagbot, gateway));
    let app = build_router(state);

    // Bind to address
    let listener = TcpListener::bind(&settings.api_address)
        .await
        .map_err(AppError::Bind)?;
    info!(
        address = %settings.api_address,
        automatic_merge = settings.tagbot.automatic_merge,
        release_notes = settings.tagbot.release_notes,
        "tag bot listening"
    );

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("tag bot stopped");
    Ok(())
}

pub fn build_router<G: HostingGateway + 'static>(state: Arc<AppState<G>>) -> Router {
    Router::new()
        .route("/webhook", post(webhook::<G>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
