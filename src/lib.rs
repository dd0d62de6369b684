//! # showdown-relay
//!
//! HTTP relay for a Pokémon Showdown connection.
//!
//! The relay holds at most one upstream WebSocket, answers the server's
//! `challstr` challenge through the login endpoint, and forwards text
//! frames that HTTP callers submit once the login has completed.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket observers)
//!     │
//!     ├── REST Handlers (api/)       /connect /send /disconnect /status
//!     ├── WS Handler (ws/)           /ws event push
//!     │
//!     ├── RelayService (service/)    session owner, connect/send
//!     ├── UpstreamTask (service/)    socket loop, login handshake
//!     ├── EventBus (domain/)
//!     │
//!     └── Showdown server + login endpoint
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
