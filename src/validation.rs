//! Request body schemas. Each endpoint that takes a body has exactly one of
//! these; unknown fields are rejected and limits are checked before any
//! store call.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
// bcrypt ignores everything past 72 bytes
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_CONTENT_LENGTH: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn invalid<T>(msg: impl Into<String>) -> Result<T, ValidationError> {
    Err(ValidationError(msg.into()))
}

fn check_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return invalid(format!(
            "username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return invalid("username must not contain whitespace");
    }
    Ok(())
}

fn check_password(field: &str, password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return invalid(format!(
            "{} must be at least {} characters",
            field, MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return invalid(format!(
            "{} must be at most {} bytes",
            field, MAX_PASSWORD_BYTES
        ));
    }
    Ok(())
}

fn check_max(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return invalid(format!("{} must be at most {} characters", field, max));
    }
    Ok(())
}

/// Display names are stored without surrounding whitespace.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

fn trimmed_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(|s| s.trim().to_string()))
}

fn check_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return invalid("title is required");
    }
    check_max("title", title, MAX_TITLE_LENGTH)
}

/// `POST /users`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
    #[serde(default, deserialize_with = "trimmed")]
    pub name: String,
}

impl Validate for SignupInput {
    fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_password("password", &self.password)?;
        check_max("name", &self.name, MAX_NAME_LENGTH)
    }
}

/// `POST /users/login`. Only presence is checked; length rules would leak
/// which accounts could exist.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl Validate for LoginInput {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_empty() {
            return invalid("username is required");
        }
        if self.password.is_empty() {
            return invalid("password is required");
        }
        Ok(())
    }
}

/// `PUT /users/{id}`. Passwords are not accepted here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub name: Option<String>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_none() && self.name.is_none() {
            return invalid("nothing to update");
        }
        if let Some(ref username) = self.username {
            check_username(username)?;
        }
        if let Some(ref name) = self.name {
            check_max("name", name, MAX_NAME_LENGTH)?;
        }
        Ok(())
    }
}

/// `PUT /users/{id}/account/password`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for PasswordChange {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.current_password.is_empty() {
            return invalid("current_password is required");
        }
        check_password("new_password", &self.new_password)
    }
}

/// `POST /users/{id}/posts`. `author` falls back to the owner's username.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostInput {
    pub author: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl PostInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Validate for PostInput {
    fn validate(&self) -> Result<(), ValidationError> {
        check_title(&self.title)?;
        if let Some(ref author) = self.author {
            check_max("author", author, MAX_NAME_LENGTH)?;
        }
        check_max("content", &self.content, MAX_CONTENT_LENGTH)
    }
}

/// `PUT /users/{id}/posts/{post_id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostUpdate {
    pub author: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Validate for PostUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.author.is_none() && self.title.is_none() && self.content.is_none() {
            return invalid("nothing to update");
        }
        if let Some(ref title) = self.title {
            check_title(title)?;
        }
        if let Some(ref author) = self.author {
            check_max("author", author, MAX_NAME_LENGTH)?;
        }
        if let Some(ref content) = self.content {
            check_max("content", content, MAX_CONTENT_LENGTH)?;
        }
        Ok(())
    }
}
