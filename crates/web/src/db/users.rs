//! `PostgreSQL` user store.

use async_trait::async_trait;
use sqlx::PgPool;

use snippetbox_core::{Email, UserId};

use super::password::{hash_password, verify_password};
use super::{RepositoryError, UserStore};

/// Name of the unique constraint on `users.email`.
const EMAIL_UNIQUE_CONSTRAINT: &str = "users_uc_email";

/// User store backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Credentials {
    id: UserId,
    hashed_password: String,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<(), RepositoryError> {
        let hashed_password = hash_password(password)?;

        sqlx::query(
            r"
            INSERT INTO users (name, email, hashed_password, created)
            VALUES ($1, $2, $3, NOW())
            ",
        )
        .bind(name)
        .bind(email.as_str())
        .bind(hashed_password)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT) =>
            {
                RepositoryError::DuplicateEmail
            }
            _ => RepositoryError::Database(e),
        })?;

        Ok(())
    }

    async fn authenticate(&self, email: &Email, password: &str) -> Result<UserId, RepositoryError> {
        let row = sqlx::query_as::<_, Credentials>(
            "SELECT id, hashed_password FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::InvalidCredentials)?;

        verify_password(password, &row.hashed_password)?;
        Ok(row.id)
    }

    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT true FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
