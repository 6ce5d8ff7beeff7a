use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory.health.check().await {
        Ok(status) => Json(serde_json::json!({
            "message": "Success",
            "connected": status.connected,
            "value": status.value,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "message": "Health check failed",
                "connected": false,
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}
