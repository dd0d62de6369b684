//! Events describing what the relay and its upstream connection are doing.
//!
//! Every session transition, login outcome, and frame crossing the upstream
//! socket is published as a [`RelayEvent`] through the [`super::EventBus`]
//! and pushed to WebSocket observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AttemptId, SessionState};

/// Coarse grouping used by observers to filter events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    /// Session lifecycle and login outcomes.
    Session,
    /// Frames received from the upstream server.
    Upstream,
    /// Frames the relay wrote to the upstream server.
    Outbound,
}

impl EventTopic {
    /// All topics, in declaration order.
    pub const ALL: [Self; 3] = [Self::Session, Self::Upstream, Self::Outbound];
}

/// Relay event, serialized with an `event_type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// The session moved to a new state.
    SessionChanged {
        /// Attempt that caused the transition.
        attempt_id: Option<AttemptId>,
        /// New state.
        state: SessionState,
        /// Login name of the attempt.
        username: Option<String>,
        /// Transition time.
        timestamp: DateTime<Utc>,
    },

    /// The login command was sent upstream.
    LoginSucceeded {
        /// Attempt that logged in.
        attempt_id: AttemptId,
        /// Login name.
        username: String,
        /// Completion time.
        timestamp: DateTime<Utc>,
    },

    /// The login exchange produced no assertion.
    LoginFailed {
        /// Attempt that failed.
        attempt_id: AttemptId,
        /// Login name.
        username: String,
        /// Failure description.
        reason: String,
        /// Failure time.
        timestamp: DateTime<Utc>,
    },

    /// A text frame arrived from the upstream server.
    UpstreamFrame {
        /// Attempt whose socket received the frame.
        attempt_id: AttemptId,
        /// Room id from a leading `>roomid` line.
        room: Option<String>,
        /// Type of the first protocol line.
        kind: Option<String>,
        /// Raw frame text.
        raw: String,
        /// Receive time.
        timestamp: DateTime<Utc>,
    },

    /// A caller frame was written to the upstream socket.
    FrameSent {
        /// Attempt whose socket carried the frame.
        attempt_id: AttemptId,
        /// Frame text.
        text: String,
        /// Write time.
        timestamp: DateTime<Utc>,
    },
}

impl RelayEvent {
    /// Returns the topic this event belongs to.
    #[must_use]
    pub const fn topic(&self) -> EventTopic {
        match self {
            Self::SessionChanged { .. } | Self::LoginSucceeded { .. } | Self::LoginFailed { .. } => {
                EventTopic::Session
            }
            Self::UpstreamFrame { .. } => EventTopic::Upstream,
            Self::FrameSent { .. } => EventTopic::Outbound,
        }
    }

    /// Returns the event type as a static string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::SessionChanged { .. } => "session_changed",
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::LoginFailed { .. } => "login_failed",
            Self::UpstreamFrame { .. } => "upstream_frame",
            Self::FrameSent { .. } => "frame_sent",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_type_tag() {
        let event = RelayEvent::SessionChanged {
            attempt_id: None,
            state: SessionState::AwaitingChallenge,
            username: Some("alice".to_string()),
            timestamp: Utc::now(),
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["event_type"], "session_changed");
        assert_eq!(json["state"], "awaiting_challenge");
        assert_eq!(event.event_type_str(), "session_changed");
    }

    #[test]
    fn topics() {
        let attempt_id = AttemptId::new();
        let frame = RelayEvent::UpstreamFrame {
            attempt_id,
            room: None,
            kind: Some("challstr".to_string()),
            raw: "|challstr|1|abc".to_string(),
            timestamp: Utc::now(),
        };
        let sent = RelayEvent::FrameSent {
            attempt_id,
            text: "/cmd rooms".to_string(),
            timestamp: Utc::now(),
        };
        let failed = RelayEvent::LoginFailed {
            attempt_id,
            username: "alice".to_string(),
            reason: "no assertion returned".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(frame.topic(), EventTopic::Upstream);
        assert_eq!(sent.topic(), EventTopic::Outbound);
        assert_eq!(failed.topic(), EventTopic::Session);
    }
}
