use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product))
        .route("/:sku", get(get_product))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let input = match body.validate() {
        Ok(input) => input,
        Err(e) => return errors::validation_error(e),
    };

    match services
        .inventory
        .catalog
        .create(input, principal.performed_by())
        .await
    {
        Ok(created) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Product created",
                "product": created.product,
                "verification": created.verification,
            })),
        )
            .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
) -> axum::response::Response {
    let sku = match dto::parse_sku(&sku) {
        Ok(sku) => sku,
        Err(e) => return errors::validation_error(e),
    };

    match services.inventory.catalog.get(&sku).await {
        Ok(product) => Json(serde_json::json!({
            "message": "Product retrieved",
            "product": product,
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
