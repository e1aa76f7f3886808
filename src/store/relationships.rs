use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::db::models::{fetch_user, resolve_posts, user_exists, Post, User};
use crate::state::DbPool;
use crate::store::StoreError;
use crate::validation::{PostInput, PostUpdate};

/// Keeps a user's ordered post reference list in step with the posts table.
///
/// Every mutation is a single statement or a single immediate transaction,
/// so concurrent writers on the same user never overwrite each other's list.
#[async_trait]
pub trait RelationshipManager: Send + Sync {
    /// Posts referenced by the user, in list order.
    async fn list_posts(&self, user_id: &str) -> Result<Vec<Post>, StoreError>;

    /// Create a post and append it to the user's list. Returns the updated user.
    async fn add_post(&self, user_id: &str, input: &PostInput) -> Result<User, StoreError>;

    /// `Ok(None)` when the post is not in the user's list.
    async fn get_post(&self, user_id: &str, post_id: &str) -> Result<Option<Post>, StoreError>;

    /// Update a post the user owns. `Ok(None)` when it is not in their list.
    async fn update_post(
        &self,
        user_id: &str,
        post_id: &str,
        changes: &PostUpdate,
    ) -> Result<Option<Post>, StoreError>;

    /// Drop the post from the user's list. Returns the updated user.
    async fn remove_post(&self, user_id: &str, post_id: &str) -> Result<User, StoreError>;
}

pub struct SqliteRelationshipManager {
    pool: DbPool,
}

impl SqliteRelationshipManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn owned_post(
    conn: &rusqlite::Connection,
    user_id: &str,
    post_id: &str,
) -> rusqlite::Result<Option<Post>> {
    let sql = format!(
        "SELECT {} FROM user_posts up JOIN posts p ON p.id = up.post_id \
         WHERE up.user_id = ?1 AND up.post_id = ?2",
        Post::COLUMNS
    );
    conn.query_row(&sql, params![user_id, post_id], Post::from_row)
        .optional()
}

#[async_trait]
impl RelationshipManager for SqliteRelationshipManager {
    async fn list_posts(&self, user_id: &str) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;
        if !user_exists(&conn, user_id)? {
            return Err(StoreError::NotFound("user"));
        }
        Ok(resolve_posts(&conn, user_id)?)
    }

    async fn add_post(&self, user_id: &str, input: &PostInput) -> Result<User, StoreError> {
        let mut conn = self.pool.get()?;
        // IMMEDIATE takes the write lock up front: the existence check, the
        // post row and the list append commit together or not at all.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let username: Option<String> = tx
            .query_row(
                "SELECT username FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        let username = username.ok_or(StoreError::NotFound("user"))?;

        let post_id = uuid::Uuid::now_v7().to_string();
        let author = input.author.clone().unwrap_or(username);
        tx.execute(
            "INSERT INTO posts (id, author, title, content) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, author, input.title, input.content],
        )?;
        tx.execute(
            "INSERT INTO user_posts (user_id, post_id) VALUES (?1, ?2)",
            params![user_id, post_id],
        )?;

        let user = fetch_user(&tx, user_id)?.ok_or(StoreError::NotFound("user"))?;
        tx.commit()?;

        tracing::debug!(user_id, post_id = %post_id, "Post added");
        Ok(user)
    }

    async fn get_post(&self, user_id: &str, post_id: &str) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;
        if !user_exists(&conn, user_id)? {
            return Err(StoreError::NotFound("user"));
        }
        Ok(owned_post(&conn, user_id, post_id)?)
    }

    async fn update_post(
        &self,
        user_id: &str,
        post_id: &str,
        changes: &PostUpdate,
    ) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;
        // Ownership is part of the UPDATE itself, not a separate read.
        let updated = conn.execute(
            "UPDATE posts SET \
                author = COALESCE(?3, author), \
                title = COALESCE(?4, title), \
                content = COALESCE(?5, content), \
                updated_at = datetime('now') \
             WHERE id = ?2 AND EXISTS ( \
                SELECT 1 FROM user_posts WHERE user_id = ?1 AND post_id = ?2)",
            params![user_id, post_id, changes.author, changes.title, changes.content],
        )?;

        if updated == 0 {
            tracing::debug!(user_id, post_id, "Post update matched nothing");
            return Ok(None);
        }
        Ok(owned_post(&conn, user_id, post_id)?)
    }

    async fn remove_post(&self, user_id: &str, post_id: &str) -> Result<User, StoreError> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM user_posts WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, post_id],
        )?;
        if removed > 0 {
            tracing::debug!(user_id, post_id, "Post removed from list");
        }

        fetch_user(&conn, user_id)?.ok_or(StoreError::NotFound("user"))
    }
}
