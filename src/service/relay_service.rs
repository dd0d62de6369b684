//! Relay service: owns the session and drives the upstream connection.
//!
//! [`RelayService`] is the single owner of the [`Session`]. Every read or
//! write goes through its `tokio::sync::Mutex`, and the lock is never held
//! across upstream network I/O. A `/connect` supersedes any attempt in
//! flight: the old upstream task is aborted and its socket dropped, and
//! transitions it may still request are rejected by attempt id.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::connect_async;

use super::LoginClient;
use super::upstream::UpstreamTask;
use crate::config::RelayConfig;
use crate::domain::session::{Connection, OutboundFrame};
use crate::domain::{AttemptId, EventBus, RelayEvent, Session, SessionState, SessionStatus};
use crate::error::{LoginError, RelayError};

/// Frames that may wait for the upstream writer before `send` blocks.
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Connection manager for the single upstream session.
///
/// Cheap to clone; clones share the same session and event bus.
#[derive(Debug, Clone)]
pub struct RelayService {
    session: Arc<Mutex<Session>>,
    event_bus: EventBus,
    login_client: LoginClient,
    upstream_url: String,
    connect_timeout: Duration,
}

impl RelayService {
    /// Creates a relay service from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if the login client cannot be built.
    pub fn new(config: &RelayConfig, event_bus: EventBus) -> Result<Self, RelayError> {
        let login_client =
            LoginClient::new(config.showdown_login_url.clone(), config.login_timeout)?;
        Ok(Self {
            session: Arc::new(Mutex::new(Session::new())),
            event_bus,
            login_client,
            upstream_url: config.showdown_ws_url.clone(),
            connect_timeout: config.upstream_connect_timeout,
        })
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the login endpoint client.
    #[must_use]
    pub fn login_client(&self) -> &LoginClient {
        &self.login_client
    }

    /// Returns a snapshot of the session.
    pub async fn status(&self) -> SessionStatus {
        self.session.lock().await.status()
    }

    /// Opens a new upstream socket for `username`, superseding any attempt
    /// in flight.
    ///
    /// Returns once the socket is open; the login handshake continues in
    /// the background and its outcome is visible through [`Self::status`]
    /// and the event bus.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidRequest`] for an empty username.
    /// - [`RelayError::UpstreamUnavailable`] if the socket cannot be opened.
    /// - [`RelayError::Superseded`] if another connect took over meanwhile.
    /// - [`RelayError::Cancelled`] if a disconnect dropped the attempt meanwhile.
    pub async fn connect(
        &self,
        username: String,
        password: String,
    ) -> Result<AttemptId, RelayError> {
        if username.trim().is_empty() {
            return Err(RelayError::InvalidRequest(
                "username must not be empty".to_string(),
            ));
        }

        let attempt = AttemptId::new();
        {
            let mut session = self.session.lock().await;
            if let Some(displaced) = session.begin(attempt, username.clone()) {
                displaced.task.abort();
                tracing::info!(%attempt, "previous upstream connection superseded");
            }
            self.publish_state(&session);
        }

        tracing::info!(%attempt, %username, url = %self.upstream_url, "opening upstream socket");
        let opened =
            tokio::time::timeout(self.connect_timeout, connect_async(self.upstream_url.as_str()))
                .await;
        let socket = match opened {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(e)) => return Err(self.open_failed(attempt, e.to_string()).await),
            Err(_) => {
                let reason = format!("timed out after {}s", self.connect_timeout.as_secs());
                return Err(self.open_failed(attempt, reason).await);
            }
        };

        let mut session = self.session.lock().await;
        if !session.is_current(attempt) {
            tracing::warn!(%attempt, "upstream socket opened for an abandoned attempt");
            return Err(abandoned(&session));
        }

        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let task = UpstreamTask::new(attempt, username, password, self.clone());
        let task = tokio::spawn(task.run(socket, outbound_rx));
        session.connection = Some(Connection { outbound, task });
        session.transition(attempt, SessionState::AwaitingChallenge);
        self.publish_state(&session);

        tracing::info!(%attempt, "connected to upstream, awaiting challenge");
        Ok(attempt)
    }

    /// Forwards `message` to the upstream socket as exactly one text frame.
    ///
    /// Returns after the socket write completes, so sequential callers see
    /// their frames delivered in call order.
    ///
    /// # Errors
    ///
    /// - [`RelayError::NotConnected`] without an open socket.
    /// - [`RelayError::NotLoggedIn`] before login completes.
    /// - [`RelayError::SendFailed`] if the socket write fails.
    pub async fn send(&self, message: String) -> Result<(), RelayError> {
        let outbound = {
            let session = self.session.lock().await;
            let connection = match session.connection.as_ref() {
                Some(connection) if session.state.is_connected() => connection,
                _ => return Err(RelayError::NotConnected),
            };
            if session.state != SessionState::Authenticated {
                return Err(RelayError::NotLoggedIn);
            }
            connection.outbound.clone()
        };

        let (ack, ack_rx) = oneshot::channel();
        outbound
            .send(OutboundFrame { text: message, ack })
            .await
            .map_err(|_| RelayError::NotConnected)?;

        ack_rx
            .await
            .map_err(|_| RelayError::NotConnected)?
            .map_err(RelayError::SendFailed)
    }

    /// Drops the upstream connection, if any, and resets the session.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        let attempt = session.attempt;
        if let Some(connection) = session.reset() {
            connection.task.abort();
        }
        self.publish_event(RelayEvent::SessionChanged {
            attempt_id: attempt,
            state: session.state,
            username: session.username.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(attempt = ?attempt, "disconnected from upstream on request");
    }

    /// Moves the session to `state` on behalf of `attempt`.
    ///
    /// Returns `false` when `attempt` has been superseded.
    pub(crate) async fn transition(&self, attempt: AttemptId, state: SessionState) -> bool {
        let mut session = self.session.lock().await;
        let applied = session.transition(attempt, state);
        if applied {
            self.publish_state(&session);
        }
        applied
    }

    /// Records a completed login for `attempt`.
    pub(crate) async fn login_succeeded(&self, attempt: AttemptId, username: &str) {
        if self.transition(attempt, SessionState::Authenticated).await {
            self.publish_event(RelayEvent::LoginSucceeded {
                attempt_id: attempt,
                username: username.to_string(),
                timestamp: Utc::now(),
            });
            tracing::info!(%attempt, %username, "logged in");
        }
    }

    /// Records a failed login for `attempt`; the socket stays open.
    pub(crate) async fn login_failed(
        &self,
        attempt: AttemptId,
        username: &str,
        error: &LoginError,
    ) {
        let mut session = self.session.lock().await;
        if !session.fail(attempt, SessionState::LoginFailed, error.to_string()) {
            return;
        }
        self.publish_state(&session);
        drop(session);

        self.publish_event(RelayEvent::LoginFailed {
            attempt_id: attempt,
            username: username.to_string(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Records that the upstream socket of `attempt` is gone.
    pub(crate) async fn upstream_closed(&self, attempt: AttemptId, reason: String) {
        let mut session = self.session.lock().await;
        if session.fail(attempt, SessionState::Disconnected, reason) {
            self.publish_state(&session);
        }
    }

    /// Publishes an event, ignoring the absence of observers.
    pub(crate) fn publish_event(&self, event: RelayEvent) {
        let event_type = event.event_type_str();
        let receivers = self.event_bus.publish(event);
        tracing::trace!(event_type, receivers, "event published");
    }

    async fn open_failed(&self, attempt: AttemptId, reason: String) -> RelayError {
        tracing::error!(%attempt, %reason, "failed to open upstream socket");
        let mut session = self.session.lock().await;
        if session.fail(attempt, SessionState::Disconnected, reason.clone()) {
            self.publish_state(&session);
            RelayError::UpstreamUnavailable(reason)
        } else {
            abandoned(&session)
        }
    }

    fn publish_state(&self, session: &Session) {
        tracing::debug!(
            attempt = ?session.attempt,
            state = session.state.as_str(),
            "session state"
        );
        self.publish_event(RelayEvent::SessionChanged {
            attempt_id: session.attempt,
            state: session.state,
            username: session.username.clone(),
            timestamp: session.updated_at,
        });
    }
}

/// Error for a connect call whose attempt no longer owns the session.
fn abandoned(session: &Session) -> RelayError {
    if session.attempt.is_none() {
        RelayError::Cancelled
    } else {
        RelayError::Superseded
    }
}
