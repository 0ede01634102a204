use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gatehouse_auth::{AuthError, AuthzError, ErrorKind, StoreError};

const INTERNAL_MESSAGE: &str = "internal server error";

pub fn auth_error_to_response(err: AuthError) -> Response {
    match err.kind() {
        ErrorKind::Validation => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        ErrorKind::Conflict => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        ErrorKind::Authentication => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        ErrorKind::Authorization => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
        ErrorKind::Infrastructure => {
            tracing::error!(error = %err, "request failed on infrastructure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> Response {
    auth_error_to_response(err.into())
}

pub fn store_error_to_response(err: StoreError) -> Response {
    auth_error_to_response(err.into())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
