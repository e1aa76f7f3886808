use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{AuthUser, ValidJson};
use crate::state::AppState;
use crate::validation::{LoginInput, PasswordChange};

// -- Response types --

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: User,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub status: u16,
    pub message: &'static str,
    pub user: User,
}

/// The token must belong to the account named in the path.
fn ensure_same_user(user: &User, id: &str) -> AppResult<()> {
    if user.id != id {
        tracing::warn!(token_user = %user.id, path_user = %id, "Token used for another account");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

// -- Handlers --

/// POST /users/login: verify credentials and hand out a bearer token
pub async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginInput>,
) -> AppResult<Response> {
    let outcome = state.auth.login(&input.username, &input.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            success: true,
            token: outcome.token,
            expires_in: state.auth.signer().ttl().num_seconds(),
            user: outcome.user,
        }),
    )
        .into_response())
}

/// GET /users/{id}/account and the account page guards under it
pub async fn account(
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<AccountResponse>> {
    ensure_same_user(&user, &id)?;
    Ok(Json(AccountResponse {
        status: StatusCode::OK.as_u16(),
        message: "login successful",
        user,
    }))
}

/// PUT /users/{id}/account/password
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<PasswordChange>,
) -> AppResult<Response> {
    ensure_same_user(&user, &id)?;
    state
        .auth
        .change_password(&user.id, &input.current_password, &input.new_password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "password updated" })),
    )
        .into_response())
}
