use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use crate::auth::password::hash_password;
use crate::db::models::{fetch_user, Credentials, User};
use crate::state::DbPool;
use crate::store::{is_unique_violation, StoreError};
use crate::validation::ProfileUpdate;

/// Users and their password hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Hash `password` and persist a new user with an empty post list.
    async fn create(&self, username: &str, password: &str, name: &str)
        -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Credentials>, StoreError>;

    /// User with posts resolved.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// All users in creation order, posts resolved.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn update_profile(
        &self,
        id: &str,
        changes: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Returns false when no such user exists.
    async fn set_password(&self, id: &str, password: &str) -> Result<bool, StoreError>;

    /// Remove the user and its reference list. Referenced posts are kept.
    async fn delete(&self, id: &str) -> Result<Option<User>, StoreError>;
}

pub struct SqliteCredentialStore {
    pool: DbPool,
    hash_cost: u32,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool, hash_cost: u32) -> Self {
        Self { pool, hash_cost }
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn create(
        &self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<User, StoreError> {
        let conn = self.pool.get()?;

        let taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StoreError::DuplicateUsername(username.to_string()));
        }

        let password_hash = hash_password(password, self.hash_cost)?;
        let id = uuid::Uuid::now_v7().to_string();

        // The UNIQUE index still catches a signup racing the check above.
        conn.execute(
            "INSERT INTO users (id, username, password_hash, name) VALUES (?1, ?2, ?3, ?4)",
            params![id, username, password_hash, name],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateUsername(username.to_string())
            } else {
                e.into()
            }
        })?;

        tracing::info!(user_id = %id, username, "User created");

        fetch_user(&conn, &id)?.ok_or(StoreError::NotFound("user"))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credentials>, StoreError> {
        let conn = self.pool.get()?;
        let creds = conn
            .query_row(
                "SELECT id, username, password_hash FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(Credentials {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(creds)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        Ok(fetch_user(&conn, id)?)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.pool.get()?;
        let ids: Vec<String> = {
            let mut stmt = conn.prepare("SELECT id FROM users ORDER BY rowid")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            // A user deleted between the two queries simply drops out.
            if let Some(user) = fetch_user(&conn, &id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: &str,
        changes: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;

        if let Some(ref username) = changes.username {
            let taken: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 AND id != ?2",
                params![username, id],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StoreError::DuplicateUsername(username.clone()));
            }
        }

        let updated = conn
            .execute(
                "UPDATE users SET username = COALESCE(?2, username), name = COALESCE(?3, name) \
                 WHERE id = ?1",
                params![id, changes.username, changes.name],
            )
            .map_err(|e| match changes.username {
                Some(ref username) if is_unique_violation(&e) => {
                    StoreError::DuplicateUsername(username.clone())
                }
                _ => e.into(),
            })?;

        if updated == 0 {
            return Ok(None);
        }
        Ok(fetch_user(&conn, id)?)
    }

    async fn set_password(&self, id: &str, password: &str) -> Result<bool, StoreError> {
        let password_hash = hash_password(password, self.hash_cost)?;
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE users SET password_hash = ?2 WHERE id = ?1",
            params![id, password_hash],
        )?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let user = match fetch_user(&tx, id)? {
            Some(user) => user,
            None => return Ok(None),
        };
        // user_posts rows go with the user (ON DELETE CASCADE)
        tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::info!(user_id = %id, orphaned_posts = user.posts.len(), "User deleted");
        Ok(Some(user))
    }
}
