//! Relay endpoint handlers: connect, send, disconnect, status.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CONNECT_ACK, ConnectRequest, DISCONNECT_ACK, SEND_ACK, SendRequest};
use crate::app_state::AppState;
use crate::domain::SessionStatus;
use crate::error::RelayError;

/// `POST /connect` — Open the upstream socket and start logging in.
///
/// # Errors
///
/// Returns [`RelayError`] on an empty username, an unreachable upstream,
/// or when a newer connect supersedes this one.
#[utoipa::path(
    post,
    path = "/connect",
    tag = "Relay",
    summary = "Connect and log in",
    description = "Opens a new upstream socket, superseding any previous one. Responds once the socket is open; the login exchange completes in the background (see `/status`).",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Socket open, login in progress", body = String, content_type = "text/plain"),
        (status = 400, description = "Empty username", body = String, content_type = "text/plain"),
        (status = 409, description = "Superseded by a newer connect or cancelled by disconnect", body = String, content_type = "text/plain"),
        (status = 502, description = "Upstream unreachable", body = String, content_type = "text/plain"),
    )
)]
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Result<impl IntoResponse, RelayError> {
    state.relay.connect(req.username, req.password).await?;
    Ok(CONNECT_ACK)
}

/// `POST /send` — Forward one frame to the upstream server.
///
/// # Errors
///
/// Returns [`RelayError`] when not connected, not logged in, or when the
/// socket write fails.
#[utoipa::path(
    post,
    path = "/send",
    tag = "Relay",
    summary = "Forward a frame",
    description = "Writes the message verbatim to the upstream socket as a single text frame. Requires a completed login.",
    request_body = SendRequest,
    responses(
        (status = 200, description = "Frame written", body = String, content_type = "text/plain"),
        (status = 400, description = "Not connected or not logged in", body = String, content_type = "text/plain"),
        (status = 502, description = "Socket write failed", body = String, content_type = "text/plain"),
    )
)]
pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<impl IntoResponse, RelayError> {
    state.relay.send(req.message).await?;
    Ok(SEND_ACK)
}

/// `POST /disconnect` — Drop the upstream socket.
#[utoipa::path(
    post,
    path = "/disconnect",
    tag = "Relay",
    summary = "Disconnect",
    description = "Closes the current upstream connection, if any, and resets the session.",
    responses(
        (status = 200, description = "Session reset", body = String, content_type = "text/plain"),
    )
)]
pub async fn disconnect(State(state): State<AppState>) -> impl IntoResponse {
    state.relay.disconnect().await;
    DISCONNECT_ACK
}

/// `GET /status` — Current session state.
#[utoipa::path(
    get,
    path = "/status",
    tag = "Relay",
    summary = "Session status",
    description = "Reports the session state, including whether the background login succeeded and the last failure.",
    responses(
        (status = 200, description = "Session snapshot", body = SessionStatus),
    )
)]
pub async fn status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.relay.status().await)
}

/// Relay routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connect", post(connect))
        .route("/send", post(send))
        .route("/disconnect", post(disconnect))
        .route("/status", get(status))
}
