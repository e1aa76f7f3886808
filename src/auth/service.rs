use std::sync::Arc;

use thiserror::Error;

use crate::auth::password::verify_password;
use crate::auth::tokens::{Claims, TokenError, TokenSigner};
use crate::db::models::User;
use crate::store::credentials::CredentialStore;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user does not exist")]
    UserNotFound,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("Token encoding error: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
}

/// Verifies credentials and issues/validates bearer tokens.
///
/// Holds no per-session state: every `verify` stands alone.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    signer: TokenSigner,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, signer: TokenSigner) -> Self {
        Self { store, signer }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let creds = match self.store.find_by_username(username).await? {
            Some(creds) => creds,
            None => {
                tracing::warn!(username, "Login for unknown user");
                return Err(AuthError::UserNotFound);
            }
        };

        if !verify_password(password, &creds.password_hash) {
            tracing::warn!(username, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.issue(&creds.id, &creds.username)?;
        let user = self
            .store
            .find_by_id(&creds.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(LoginOutcome { token, user })
    }

    /// Decode `token` and resolve the user it names.
    pub async fn verify(&self, token: &str) -> Result<User, AuthError> {
        let claims: Claims = self.signer.decode(token).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AuthError::Unauthorized
        })?;

        // A valid signature for a deleted account is still no account.
        match self.store.find_by_id(&claims.id).await? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!(user_id = %claims.id, "Token for missing user");
                Err(AuthError::Unauthorized)
            }
        }
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        current: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let creds = self
            .store
            .find_by_username(&user.username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(current, &creds.password_hash) {
            tracing::warn!(user_id, "Password change with wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        if !self.store.set_password(user_id, new_password).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;
    use crate::store::credentials::SqliteCredentialStore;
    use chrono::{Duration, Utc};

    fn service() -> AuthService {
        let store = Arc::new(SqliteCredentialStore::new(test_pool(), 4));
        AuthService::new(store, TokenSigner::new(b"secret", Duration::days(5)))
    }

    #[tokio::test]
    async fn login_returns_token_for_created_user() {
        let auth = service();
        let alice = auth.store.create("alice", "correct", "").await.unwrap();

        let outcome = auth.login("alice", "correct").await.unwrap();
        assert_eq!(outcome.user.id, alice.id);
        let claims = auth.signer().decode(&outcome.token).unwrap();
        assert_eq!(claims.id, alice.id);
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_from_bad_password() {
        let auth = service();
        auth.store.create("alice", "correct", "").await.unwrap();

        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("bob", "correct").await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn login_with_overflowing_lifetime_fails_cleanly() {
        let store = Arc::new(SqliteCredentialStore::new(test_pool(), 4));
        let auth = AuthService::new(
            store.clone(),
            TokenSigner::new(b"secret", Duration::days(100_000_000)),
        );
        store.create("alice", "correct", "").await.unwrap();

        let result = tokio::spawn(async move { auth.login("alice", "correct").await })
            .await
            .expect("login must not panic");
        assert!(matches!(
            result,
            Err(AuthError::Token(TokenError::ExpiryOverflow))
        ));
    }

    #[tokio::test]
    async fn verify_resolves_user() {
        let auth = service();
        auth.store.create("alice", "correct", "").await.unwrap();
        let outcome = auth.login("alice", "correct").await.unwrap();

        let user = auth.verify(&outcome.token).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn verify_rejects_tampered_and_expired_tokens() {
        let auth = service();
        let alice = auth.store.create("alice", "correct", "").await.unwrap();
        let token = auth.login("alice", "correct").await.unwrap().token;

        let tampered = format!("{}x", token);
        assert!(matches!(
            auth.verify(&tampered).await,
            Err(AuthError::Unauthorized)
        ));

        let stale = auth
            .signer()
            .issue_at(&alice.id, "alice", Utc::now() - Duration::days(5) - Duration::minutes(1))
            .unwrap();
        assert!(matches!(
            auth.verify(&stale).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn verify_rejects_token_of_deleted_user() {
        let auth = service();
        let alice = auth.store.create("alice", "correct", "").await.unwrap();
        let token = auth.login("alice", "correct").await.unwrap().token;
        auth.store.delete(&alice.id).await.unwrap();

        assert!(matches!(
            auth.verify(&token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let auth = service();
        let alice = auth.store.create("alice", "correct", "").await.unwrap();

        assert!(matches!(
            auth.change_password(&alice.id, "wrong", "fresh").await,
            Err(AuthError::InvalidCredentials)
        ));

        auth.change_password(&alice.id, "correct", "fresh")
            .await
            .unwrap();
        assert!(auth.login("alice", "fresh").await.is_ok());
        assert!(matches!(
            auth.login("alice", "correct").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
