use axum::Router;

pub mod audit;
pub mod feature;
pub mod inventory;
pub mod products;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/api/product", products::router())
        .nest("/api/inventory", inventory::router())
        .nest("/api/audit", audit::router())
        .nest("/api/feature", feature::router())
}
