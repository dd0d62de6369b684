//! Relay session: the single upstream connection and its login state.
//!
//! [`Session`] is owned by [`crate::service::RelayService`] and only ever
//! mutated under its lock. Transitions requested by an upstream task are
//! applied through [`Session::transition`], which drops them when the task's
//! attempt is no longer current.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use super::AttemptId;

/// Lifecycle state of the relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No upstream socket.
    Disconnected,
    /// Socket is being opened.
    Connecting,
    /// Socket is open, waiting for the `challstr` frame.
    AwaitingChallenge,
    /// Challenge received, login exchange in flight.
    LoggingIn,
    /// Login command sent; frames may be forwarded.
    Authenticated,
    /// Login endpoint returned no assertion. Socket stays open.
    LoginFailed,
}

impl SessionState {
    /// Returns `true` while an upstream socket exists and is open.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(
            self,
            Self::AwaitingChallenge | Self::LoggingIn | Self::Authenticated | Self::LoginFailed
        )
    }

    /// Returns the snake_case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingChallenge => "awaiting_challenge",
            Self::LoggingIn => "logging_in",
            Self::Authenticated => "authenticated",
            Self::LoginFailed => "login_failed",
        }
    }
}

/// A text frame queued for the upstream socket, with its write acknowledgement.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Frame payload, forwarded verbatim.
    pub text: String,
    /// Resolved once the socket write returns.
    pub ack: oneshot::Sender<Result<(), String>>,
}

/// Handle to the upstream task of the current attempt.
#[derive(Debug)]
pub struct Connection {
    /// Queue into the task's socket writer.
    pub outbound: mpsc::Sender<OutboundFrame>,
    /// The task itself; aborted when the attempt is displaced.
    pub task: JoinHandle<()>,
}

/// Mutable session state behind the relay service lock.
#[derive(Debug)]
pub struct Session {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Attempt that owns the session, if any.
    pub attempt: Option<AttemptId>,
    /// Last submitted login name.
    pub username: Option<String>,
    /// Upstream task handle while a socket is open.
    pub connection: Option<Connection>,
    /// Most recent failure, cleared on a new attempt.
    pub last_error: Option<String>,
    /// Time of the last transition.
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty, disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            attempt: None,
            username: None,
            connection: None,
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Starts a new attempt, displacing the previous one.
    ///
    /// Returns the displaced connection so the caller can abort its task.
    pub fn begin(&mut self, attempt: AttemptId, username: String) -> Option<Connection> {
        let displaced = self.connection.take();
        self.attempt = Some(attempt);
        self.username = Some(username);
        self.last_error = None;
        self.set_state(SessionState::Connecting);
        displaced
    }

    /// Returns `true` if `attempt` still owns the session.
    #[must_use]
    pub fn is_current(&self, attempt: AttemptId) -> bool {
        self.attempt == Some(attempt)
    }

    /// Moves to `state` on behalf of `attempt`.
    ///
    /// Returns `false` and leaves the session untouched when `attempt` has
    /// been superseded.
    pub fn transition(&mut self, attempt: AttemptId, state: SessionState) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.set_state(state);
        true
    }

    /// Records a failure for `attempt`; ignored when superseded.
    pub fn fail(&mut self, attempt: AttemptId, state: SessionState, reason: String) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.last_error = Some(reason);
        if !state.is_connected() {
            self.connection = None;
        }
        self.set_state(state);
        true
    }

    /// Drops the connection and returns to `Disconnected`.
    ///
    /// Returns the removed connection so the caller can abort its task.
    pub fn reset(&mut self) -> Option<Connection> {
        let connection = self.connection.take();
        self.attempt = None;
        self.set_state(SessionState::Disconnected);
        connection
    }

    /// Snapshot for `/status` and observers.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            authenticated: self.state == SessionState::Authenticated,
            username: self.username.clone(),
            attempt_id: self.attempt,
            last_error: self.last_error.clone(),
            updated_at: self.updated_at,
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Read-only view of the session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Whether frames may be forwarded.
    pub authenticated: bool,
    /// Last submitted login name.
    pub username: Option<String>,
    /// Attempt that owns the session.
    pub attempt_id: Option<AttemptId>,
    /// Most recent failure.
    pub last_error: Option<String>,
    /// Time of the last transition.
    pub updated_at: DateTime<Utc>,
}
