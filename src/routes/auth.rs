use axum::routing::{get, post, put};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/login", post(handlers::login))
        .route("/users/{id}/account", get(handlers::account))
        .route("/users/{id}/account/update", get(handlers::account))
        .route("/users/{id}/account/update/password", get(handlers::account))
        .route("/users/{id}/account/delete", get(handlers::account))
        .route("/users/{id}/account/password", put(handlers::change_password))
}
