//! Relay request bodies and acknowledgement texts.

use serde::Deserialize;
use utoipa::ToSchema;

/// Acknowledgement for `POST /connect`; the login continues afterwards.
pub const CONNECT_ACK: &str = "Connecting to Showdown...";

/// Acknowledgement for `POST /send`.
pub const SEND_ACK: &str = "Message sent to Showdown";

/// Acknowledgement for `POST /disconnect`.
pub const DISCONNECT_ACK: &str = "Disconnected from Showdown";

/// Request body for `POST /connect`.
#[derive(Deserialize, ToSchema)]
pub struct ConnectRequest {
    /// Login name.
    pub username: String,
    /// Account password; empty for unregistered names.
    #[serde(default)]
    pub password: String,
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body for `POST /send`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendRequest {
    /// Frame forwarded verbatim to the upstream server.
    pub message: String,
}
