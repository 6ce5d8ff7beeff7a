use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
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
        .route("/transaction", post(record_transaction))
        .route("/history/:sku", get(get_history))
        .route("/snapshot", get(get_snapshot))
}

pub async fn record_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::RecordTransactionRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let request = match body.validate() {
        Ok(r) => r,
        Err(e) => return errors::validation_error(e),
    };

    match services
        .inventory
        .recorder
        .record(request, principal.performed_by())
        .await
    {
        Ok(recorded) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Transaction recorded",
                "transaction": recorded.transaction,
                "verified": recorded.verified,
            })),
        )
            .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    let (sku, size) = match (dto::parse_sku(&sku), query.validate()) {
        (Ok(sku), Ok(size)) => (sku, size),
        (sku, size) => {
            let mut all = sku.err().unwrap_or_default();
            all.extend(size.err().unwrap_or_default());
            return errors::validation_error(all);
        }
    };

    match services.inventory.history.history(&sku, size).await {
        Ok(history) => Json(serde_json::json!({
            "message": "Transaction history retrieved",
            "sku": history.sku,
            "transactions": history.transactions,
            "running_balance": history.running_balance,
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn get_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.inventory.snapshot.build().await {
        Ok(snapshot) => Json(serde_json::json!({
            "message": "Inventory snapshot generated",
            "snapshot": snapshot,
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
