use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/time-travel/:sku/at/:timestamp", get(inventory_at))
}

pub async fn inventory_at(
    Extension(services): Extension<Arc<AppServices>>,
    Path((sku, timestamp)): Path<(String, String)>,
) -> axum::response::Response {
    let (sku, at) = match (dto::parse_sku(&sku), dto::parse_timestamp(&timestamp)) {
        (Ok(sku), Ok(at)) => (sku, at),
        (sku, at) => {
            let mut all = sku.err().unwrap_or_default();
            all.extend(at.err().unwrap_or_default());
            return errors::validation_error(all);
        }
    };

    match services.inventory.history.inventory_at(&sku, at).await {
        Ok(snapshot) => Json(serde_json::json!({
            "message": "Inventory at timestamp retrieved",
            "sku": snapshot.sku,
            "timestamp": snapshot.timestamp,
            "inventory": snapshot.inventory,
            "transactions": snapshot.transactions,
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
