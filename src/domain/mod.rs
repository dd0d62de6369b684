//! Domain layer: session model, upstream protocol, and event system.
//!
//! This module holds the relay's session state machine, the attempt
//! identity that guards it, the upstream wire format, and the event bus
//! that broadcasts what happens to observers.

pub mod attempt_id;
pub mod event_bus;
pub mod protocol;
pub mod relay_event;
pub mod session;

pub use attempt_id::AttemptId;
pub use event_bus::EventBus;
pub use relay_event::{EventTopic, RelayEvent};
pub use session::{Session, SessionState, SessionStatus};
