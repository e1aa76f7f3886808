use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::db::models::User;
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::Validate;

/// The user named by a valid bearer token.
/// Rejects with 401 before the handler runs when the token is missing,
/// malformed, expired, or names a user that no longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts).ok_or_else(|| {
            tracing::debug!("Missing or malformed Authorization header");
            AppError::Unauthorized
        })?;

        let user = state.auth.verify(token).await?;
        Ok(AuthUser(user))
    }
}

/// Optional user extractor. Returns None instead of 401 when not authenticated.
/// Tokens are only looked at when `auth.require_owner` is on; store failures
/// during the lookup still reject the request.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.auth.require_owner {
            return Ok(MaybeUser(None));
        }
        match AuthUser::from_request_parts(parts, state).await {
            Ok(AuthUser(user)) => Ok(MaybeUser(Some(user))),
            Err(AppError::Unauthorized) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

impl MaybeUser {
    /// Enforce `auth.require_owner` for a mutation on `owner_id`'s resources.
    /// A no-op when the setting is off.
    pub fn authorize_owner(&self, state: &AppState, owner_id: &str) -> Result<(), AppError> {
        if !state.config.auth.require_owner {
            return Ok(());
        }
        match &self.0 {
            None => Err(AppError::Unauthorized),
            Some(user) if user.id != owner_id => Err(AppError::Forbidden),
            Some(_) => Ok(()),
        }
    }
}

/// JSON body that has been deserialized and passed `Validate`.
/// Both malformed JSON and rule violations become a 400 `ValidationError`.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
