use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use gatehouse_auth::{
    LoginRequest, Principal, Role, SignupRequest, UserKey, bounded, require_ownership_or_admin,
    require_role,
};
use gatehouse_core::UserId;

use crate::app::dto::{ListUsersQuery, SignupResponse, UserListResponse, UserResponse};
use crate::app::errors::{auth_error_to_response, authz_error_to_response, json_error, store_error_to_response};
use crate::app::services::AppServices;

fn bad_body(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match services.accounts().signup(request).await {
        Ok(user_id) => (StatusCode::OK, Json(SignupResponse { user_id })).into_response(),
        Err(e) => auth_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match services.accounts().login(request).await {
        Ok(record) => (StatusCode::OK, Json(UserResponse::from(record))).into_response(),
        Err(e) => auth_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListUsersQuery>,
) -> Response {
    if let Err(e) = require_role(&principal, Role::Admin) {
        return authz_error_to_response(e);
    }

    let page = match query.to_page() {
        Ok(page) => page,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, "validation_error", message),
    };

    match bounded(services.timeout(), services.store().list(page)).await {
        Ok(page) => (StatusCode::OK, Json(UserListResponse::from(page))).into_response(),
        Err(e) => store_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> Response {
    let user_id: UserId = match user_id.parse() {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_user_id", format!("{e}")),
    };

    if let Err(e) = require_ownership_or_admin(&principal, &user_id) {
        return authz_error_to_response(e);
    }

    let found = bounded(
        services.timeout(),
        services.store().find_one_where(&UserKey::UserId(user_id)),
    )
    .await;
    match found {
        Ok(Some(record)) => (StatusCode::OK, Json(UserResponse::from(record))).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => store_error_to_response(e),
    }
}
