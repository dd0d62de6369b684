//! REST API layer: route handlers, DTOs, router composition, OpenAPI doc.
//!
//! The relay endpoints are mounted at the root, as callers expect
//! `/connect` and `/send` there.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "showdown-relay", description = "HTTP relay for a Pokémon Showdown connection"),
    paths(
        handlers::relay::connect,
        handlers::relay::send,
        handlers::relay::disconnect,
        handlers::relay::status,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::ConnectRequest,
        dto::SendRequest,
        handlers::system::HealthResponse,
        crate::domain::SessionStatus,
        crate::domain::SessionState,
        crate::domain::AttemptId,
    )),
    tags(
        (name = "Relay", description = "Upstream connection and frame forwarding"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
