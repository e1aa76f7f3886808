use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::db::models::{Post, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{MaybeUser, ValidJson};
use crate::state::AppState;
use crate::validation::{PostInput, PostUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/posts", get(list_posts).post(add_post))
        .route(
            "/users/{id}/posts/{post_id}",
            get(get_post).put(update_post).delete(remove_post),
        )
}

async fn list_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.posts.list_posts(&id).await?))
}

async fn add_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: MaybeUser,
    ValidJson(input): ValidJson<PostInput>,
) -> AppResult<Response> {
    caller.authorize_owner(&state, &id)?;
    let user = state.posts.add_post(&id, &input).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn get_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
) -> AppResult<Json<Post>> {
    state
        .posts
        .get_post(&id, &post_id)
        .await?
        .map(Json)
        .ok_or_else(AppError::document_not_found)
}

async fn update_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
    caller: MaybeUser,
    ValidJson(changes): ValidJson<PostUpdate>,
) -> AppResult<Json<Post>> {
    caller.authorize_owner(&state, &id)?;
    state
        .posts
        .update_post(&id, &post_id, &changes)
        .await?
        .map(Json)
        .ok_or_else(AppError::document_not_found)
}

async fn remove_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(String, String)>,
    caller: MaybeUser,
) -> AppResult<Json<User>> {
    caller.authorize_owner(&state, &id)?;
    Ok(Json(state.posts.remove_post(&id, &post_id).await?))
}
