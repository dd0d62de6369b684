//! WebSocket layer: observer connections, message envelope, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes relay events to observers so a
//! caller can follow the background login after `/connect` returns.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
