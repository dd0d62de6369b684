//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::EventBus;
use crate::error::RelayError;
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Connection manager owning the upstream session.
    pub relay: Arc<RelayService>,
    /// Event bus for WebSocket observers.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds the domain and service layers from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if the login client cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let relay = Arc::new(RelayService::new(config, event_bus.clone())?);
        Ok(Self { relay, event_bus })
    }
}
