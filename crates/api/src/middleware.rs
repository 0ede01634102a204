use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use gatehouse_auth::{Principal, TokenService};

use crate::app::errors::json_error;

/// Header accepted as an alternative to `Authorization: Bearer`.
pub const TOKEN_HEADER: &str = "token";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
}

/// Validate the request token and attach the caller's [`Principal`].
///
/// Any failure ends the request with 401 and the validator's message.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_token(req.headers()) {
        Ok(token) => token,
        Err(message) => return json_error(StatusCode::UNAUTHORIZED, "unauthorized", message),
    };

    let claims = match state.tokens.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected request token");
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string());
        }
    };

    req.extensions_mut().insert(Principal::from_claims(&claims));
    next.run(req).await
}

fn extract_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let raw = match headers.get(axum::http::header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map_err(|_| "authorization header is not valid ASCII")?
            .strip_prefix("Bearer ")
            .ok_or("authorization header must use the Bearer scheme")?,
        None => headers
            .get(TOKEN_HEADER)
            .ok_or("no authorization header provided")?
            .to_str()
            .map_err(|_| "token header is not valid ASCII")?,
    };

    let token = raw.trim();
    if token.is_empty() {
        return Err("no authorization header provided");
    }
    Ok(token)
}
