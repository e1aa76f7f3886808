use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{MaybeUser, ValidJson};
use crate::state::AppState;
use crate::validation::{ProfileUpdate, SignupInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index).post(create))
        .route("/users/{id}", get(show).put(update).delete(destroy))
}

// GET /users
async fn index(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

// POST /users
async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<SignupInput>,
) -> AppResult<Response> {
    let user = state
        .users
        .create(&input.username, &input.password, &input.name)
        .await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

// GET /users/{id}
async fn show(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<User>> {
    state
        .users
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(AppError::document_not_found)
}

// PUT /users/{id}
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: MaybeUser,
    ValidJson(changes): ValidJson<ProfileUpdate>,
) -> AppResult<Json<User>> {
    caller.authorize_owner(&state, &id)?;
    state
        .users
        .update_profile(&id, &changes)
        .await?
        .map(Json)
        .ok_or_else(AppError::document_not_found)
}

// DELETE /users/{id}
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: MaybeUser,
) -> AppResult<Json<User>> {
    caller.authorize_owner(&state, &id)?;
    state
        .users
        .delete(&id)
        .await?
        .map(Json)
        .ok_or_else(AppError::document_not_found)
}
