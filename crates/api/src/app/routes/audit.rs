use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockledger_infra::services::StockError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/verify/:transaction_id", get(verify_transaction))
}

pub async fn verify_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(transaction_id): Path<String>,
) -> axum::response::Response {
    // Anything that is not a v4 id cannot name a stored transaction.
    let Ok(id) = dto::parse_transaction_id(&transaction_id) else {
        return errors::stock_error_to_response(StockError::not_found("Transaction not found"));
    };

    match services.inventory.audit.lookup(&id).await {
        Ok(audited) => Json(serde_json::json!({
            "message": "Transaction verified",
            "transaction": audited.transaction,
            "verified": audited.verified,
        }))
        .into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
