use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use hosting_gateway::HostingGateway;
use tracing::{debug, instrument};

use crate::core::app_state::AppState;

/// Shared-secret header set by GitLab on every delivery.
pub const TOKEN_HEADER: &str = "x-gitlab-token";

/// POST /webhook
///
/// Always answers 200 with a plain-text body: "No error" when the event was
/// acted on, otherwise the reason it was not.
#[instrument(skip_all)]
pub async fn webhook<G: HostingGateway + 'static>(
    State(state): State<Arc<AppState<G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let token = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
    debug!(bytes = body.len(), has_token = token.is_some(), "webhook received");

    let answer = state.dispatcher.respond(token, &body).await;
    (StatusCode::OK, answer)
}
