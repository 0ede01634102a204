use axum::{
    routing::{get, post},
    Router,
};

pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/users/signup", post(users::signup))
        .route("/users/login", post(users::login))
}

/// Endpoints behind the token middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/users/:user_id", get(users::get_user))
}
