//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is returned by every HTTP-facing operation. Each variant
//! maps to a status code and renders as a `text/plain` reason, matching the
//! relay's plain-text acknowledgements. [`LoginError`] and [`FrameError`]
//! stay inside the upstream task: they are logged and published as events
//! but never reach an HTTP caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Server-side error enum with HTTP status code mapping.
///
/// | Variant               | HTTP Status               |
/// |-----------------------|---------------------------|
/// | `NotConnected`        | 400 Bad Request           |
/// | `NotLoggedIn`         | 400 Bad Request           |
/// | `InvalidRequest`      | 400 Bad Request           |
/// | `Superseded`          | 409 Conflict              |
/// | `Cancelled`           | 409 Conflict              |
/// | `UpstreamUnavailable` | 502 Bad Gateway           |
/// | `SendFailed`          | 502 Bad Gateway           |
/// | `Internal`            | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No open upstream socket.
    #[error("Not connected to Showdown")]
    NotConnected,

    /// Socket is open but login has not completed.
    #[error("Not logged in yet")]
    NotLoggedIn,

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A newer connect attempt took over while this one was opening.
    #[error("connect attempt superseded")]
    Superseded,

    /// A `/disconnect` dropped this attempt while it was opening.
    #[error("connect attempt cancelled by disconnect")]
    Cancelled,

    /// The upstream socket could not be opened.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream socket rejected a frame.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConnected | Self::NotLoggedIn | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Superseded | Self::Cancelled => StatusCode::CONFLICT,
            Self::UpstreamUnavailable(_) | Self::SendFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Failure of the challenge/assertion exchange with the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// The HTTP call itself failed or timed out.
    #[error("login request failed: {0}")]
    Transport(String),

    /// The response body was not the expected JSON.
    #[error("malformed login response: {0}")]
    MalformedResponse(String),

    /// The endpoint answered without a usable assertion.
    #[error("login rejected: {0}")]
    Rejected(String),
}

/// Malformed upstream frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A `challstr` line without both token fields.
    #[error("malformed challstr line: {0}")]
    MalformedChallenge(String),
}
