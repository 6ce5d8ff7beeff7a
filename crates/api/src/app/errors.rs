use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockledger_core::DomainError;
use stockledger_infra::services::StockError;

use crate::app::dto::FieldError;

pub fn stock_error_to_response(err: StockError) -> axum::response::Response {
    match err {
        StockError::Domain(DomainError::Validation(msg))
        | StockError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        StockError::Domain(DomainError::InsufficientStock {
            available,
            requested,
        }) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": "Insufficient stock",
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        StockError::Domain(DomainError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        StockError::Domain(DomainError::CorruptData(msg)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "corrupt_data", msg)
        }
        StockError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        StockError::Verification(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "verification_failed", msg)
        }
        StockError::Ledger(e) => {
            tracing::error!(error = %e, "ledger operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "ledger_error", e.to_string())
        }
    }
}

pub fn validation_error(errors: Vec<FieldError>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": "Validation failed",
            "errors": errors,
        })),
    )
        .into_response()
}

pub fn json_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_infra::ledger::LedgerError;

    #[test]
    fn errors_map_to_their_status_codes() {
        let cases = [
            (StockError::Domain(DomainError::validation("bad")), StatusCode::BAD_REQUEST),
            (
                StockError::Domain(DomainError::InsufficientStock { available: 1, requested: 2 }),
                StatusCode::BAD_REQUEST,
            ),
            (StockError::Domain(DomainError::conflict("dup")), StatusCode::CONFLICT),
            (StockError::not_found("gone"), StatusCode::NOT_FOUND),
            (
                StockError::Domain(DomainError::corrupt("junk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (StockError::Verification("proof".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                StockError::Ledger(LedgerError::Connection("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(stock_error_to_response(err).status(), status);
        }
    }
}
