//! Upstream connection task.
//!
//! One [`UpstreamTask`] runs per connect attempt and exclusively owns the
//! upstream socket. It reads frames, answers the `challstr` challenge with
//! the login exchange, and writes caller frames queued by
//! [`RelayService::send`]. When the socket ends, the session is reset.

use std::fmt;

use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::RelayService;
use crate::domain::protocol::{Challenge, Frame, login_command};
use crate::domain::session::OutboundFrame;
use crate::domain::{AttemptId, RelayEvent, SessionState};

/// Upstream socket as returned by `connect_async`.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

type UpstreamSink = SplitSink<UpstreamSocket, Message>;

/// Read/write loop for one connect attempt.
pub struct UpstreamTask {
    attempt: AttemptId,
    username: String,
    password: String,
    service: RelayService,
}

impl fmt::Debug for UpstreamTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamTask")
            .field("attempt", &self.attempt)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl UpstreamTask {
    /// Creates the task for `attempt`.
    #[must_use]
    pub fn new(
        attempt: AttemptId,
        username: String,
        password: String,
        service: RelayService,
    ) -> Self {
        Self {
            attempt,
            username,
            password,
            service,
        }
    }

    /// Runs until the socket closes, errors, or a write fails.
    pub async fn run(
        self,
        socket: UpstreamSocket,
        mut outbound_rx: mpsc::Receiver<OutboundFrame>,
    ) {
        let (mut ws_tx, mut ws_rx) = socket.split();

        let reason = loop {
            tokio::select! {
                // Frame from the upstream server
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(reason) = self.handle_frame(text.as_str(), &mut ws_tx).await {
                                break reason;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break match frame {
                                Some(frame) => format!(
                                    "upstream closed the connection ({}): {}",
                                    u16::from(frame.code),
                                    frame.reason.as_str()
                                ),
                                None => "upstream closed the connection".to_string(),
                            };
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break format!("websocket error: {e}"),
                        None => break "upstream closed the connection".to_string(),
                    }
                }
                // Caller frame queued by `send`
                Some(frame) = outbound_rx.recv() => {
                    if let Err(reason) = self.forward(frame, &mut ws_tx).await {
                        break reason;
                    }
                }
            }
        };

        tracing::warn!(attempt = %self.attempt, %reason, "disconnected from upstream");
        self.service.upstream_closed(self.attempt, reason).await;
    }

    async fn handle_frame(&self, raw: &str, ws_tx: &mut UpstreamSink) -> Result<(), String> {
        tracing::debug!(attempt = %self.attempt, frame = raw, "upstream frame");
        let frame = Frame::parse(raw);

        self.service.publish_event(RelayEvent::UpstreamFrame {
            attempt_id: self.attempt,
            room: frame.room.map(str::to_string),
            kind: frame.kind().map(str::to_string),
            raw: raw.to_string(),
            timestamp: Utc::now(),
        });

        match frame.challenge() {
            Ok(Some(challenge)) => self.login(&challenge, ws_tx).await,
            Ok(None) => Ok(()),
            Err(e) => {
                tracing::warn!(attempt = %self.attempt, error = %e, "ignoring malformed frame");
                Ok(())
            }
        }
    }

    async fn login(&self, challenge: &Challenge, ws_tx: &mut UpstreamSink) -> Result<(), String> {
        if !self
            .service
            .transition(self.attempt, SessionState::LoggingIn)
            .await
        {
            return Ok(());
        }
        let login_client = self.service.login_client();
        tracing::info!(
            attempt = %self.attempt,
            username = %self.username,
            url = login_client.login_url(),
            "got challstr, logging in"
        );

        let assertion = login_client
            .assertion(&self.username, &self.password, challenge)
            .await;

        match assertion {
            Ok(assertion) => {
                let command = login_command(&self.username, &assertion);
                ws_tx
                    .send(Message::text(command))
                    .await
                    .map_err(|e| format!("failed to send login command: {e}"))?;
                self.service
                    .login_succeeded(self.attempt, &self.username)
                    .await;
            }
            Err(e) => {
                tracing::error!(attempt = %self.attempt, username = %self.username, error = %e, "login failed");
                self.service
                    .login_failed(self.attempt, &self.username, &e)
                    .await;
            }
        }
        Ok(())
    }

    async fn forward(&self, frame: OutboundFrame, ws_tx: &mut UpstreamSink) -> Result<(), String> {
        let OutboundFrame { text, ack } = frame;
        let result = ws_tx
            .send(Message::text(text.clone()))
            .await
            .map_err(|e| e.to_string());

        let outcome = match &result {
            Ok(()) => {
                tracing::info!(attempt = %self.attempt, message = %text, "sent");
                self.service.publish_event(RelayEvent::FrameSent {
                    attempt_id: self.attempt,
                    text,
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Err(e) => Err(format!("write failed: {e}")),
        };

        // caller may have gone away
        let _ = ack.send(result);
        outcome
    }
}
