use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A user as returned to clients: posts resolved, password hash never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub posts: Vec<Post>,
    pub created_at: String,
}

/// The row the auth path needs. Deliberately not `Serialize`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Post {
    pub(crate) const COLUMNS: &'static str =
        "p.id, p.author, p.title, p.content, p.created_at, p.updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Post {
            id: row.get(0)?,
            author: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

/// Resolve a user's reference list into posts, in list order.
pub(crate) fn resolve_posts(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM user_posts up JOIN posts p ON p.id = up.post_id \
         WHERE up.user_id = ?1 ORDER BY up.seq",
        Post::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params![user_id], Post::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

/// Load a user by id with posts resolved.
pub(crate) fn fetch_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, name, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, username, name, created_at)) => {
            let posts = resolve_posts(conn, &id)?;
            Ok(Some(User {
                id,
                username,
                name,
                posts,
                created_at,
            }))
        }
        None => Ok(None),
    }
}

pub(crate) fn user_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}
