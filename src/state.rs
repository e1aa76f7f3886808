use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::service::AuthService;
use crate::auth::tokens::TokenSigner;
use crate::config::Config;
use crate::store::credentials::{CredentialStore, SqliteCredentialStore};
use crate::store::relationships::{RelationshipManager, SqliteRelationshipManager};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn CredentialStore>,
    pub posts: Arc<dyn RelationshipManager>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wire the stores and the auth service on top of a migrated pool.
    /// `config.auth.jwt_secret` must already be resolved (see `Config::load`).
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let secret = config
            .auth
            .signing_secret()
            .ok_or_else(|| anyhow::anyhow!("auth.jwt_secret is not set"))?;
        let ttl = config.auth.token_ttl()?;

        let users: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(
            db.clone(),
            config.auth.bcrypt_cost,
        ));
        let posts: Arc<dyn RelationshipManager> =
            Arc::new(SqliteRelationshipManager::new(db));

        let signer = TokenSigner::new(secret.as_bytes(), ttl);
        let auth = Arc::new(AuthService::new(users.clone(), signer));

        Ok(Self {
            config,
            users,
            posts,
            auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;

    fn config_with_secret(secret: &str) -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = Some(secret.to_string());
        config.auth.bcrypt_cost = 4;
        config
    }

    #[test]
    fn blank_secret_is_refused() {
        assert!(AppState::new(test_pool(), config_with_secret("")).is_err());
        assert!(AppState::new(test_pool(), config_with_secret("  ")).is_err());
        assert!(AppState::new(test_pool(), config_with_secret("s3cret")).is_ok());
    }

    #[test]
    fn out_of_range_ttl_is_refused() {
        let mut config = config_with_secret("s3cret");
        config.auth.token_ttl_days = 100_000_000;
        assert!(AppState::new(test_pool(), config.clone()).is_err());
        config.auth.token_ttl_days = i64::MAX;
        assert!(AppState::new(test_pool(), config).is_err());
    }
}
