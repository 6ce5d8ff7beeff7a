//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger client + inventory services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and field validation
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use stockledger_infra::config::AppConfig;
use stockledger_infra::ledger::{LedgerConnector, LedgerError};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(
    config: AppConfig,
    connector: Arc<dyn LedgerConnector>,
) -> Result<Router, LedgerError> {
    let services = Arc::new(services::build_services(&config, connector).await?);
    Ok(router(services, &config.server.api_key))
}

/// Router over already-wired services.
pub fn router(services: Arc<services::AppServices>, api_key: &str) -> Router {
    let auth_state = middleware::AuthState {
        api_key: Arc::from(api_key),
    };

    // Protected routes: require the shared api key.
    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
