use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, StoreError, User, DEFAULT_THEME};

const UNIQUE_VIOLATION: &str = "23505";

/// Persistence for user records, looked up by email or id.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a user with the default theme. Fails with
    /// [`StoreError::DuplicateEmail`] if the email is taken at write time.
    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError>;

    /// Returns `false` when no user has this id.
    async fn set_theme(&self, id: Uuid, theme: &str) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, theme, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, theme, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser<'_>) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, theme)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, theme, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(DEFAULT_THEME)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn set_theme(&self, id: Uuid, theme: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"UPDATE users SET theme = $2 WHERE id = $1"#)
            .bind(id)
            .bind(theme)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.as_ref() == UNIQUE_VIOLATION),
        _ => false,
    }
}
