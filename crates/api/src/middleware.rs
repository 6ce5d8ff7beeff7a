use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Clone)]
pub struct AuthState {
    pub api_key: Arc<str>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let authorized = header_str(req.headers(), API_KEY_HEADER)
        .map(|provided| constant_time_eq(provided.as_bytes(), state.api_key.as_bytes()))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = %req.uri().path(), "rejected request without a valid api key");
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized");
    }

    let email = header_str(req.headers(), USER_EMAIL_HEADER).map(str::to_string);
    req.extensions_mut().insert(PrincipalContext::new(email));

    next.run(req).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
