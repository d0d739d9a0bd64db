use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_THEME: &str = "light";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub theme: String,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Stored theme, falling back to the default when empty.
    pub fn theme_or_default(&self) -> &str {
        if self.theme.is_empty() {
            DEFAULT_THEME
        } else {
            &self.theme
        }
    }
}

/// Fields needed to insert a user; id and timestamp are assigned by the store.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
