//! Persistence for snippets and users.
//!
//! # Tables
//!
//! - `snippets` - Text snippets with an absolute expiry
//! - `users` - Accounts with argon2 password hashes
//! - `tower_sessions.session` - Session records (created by `PostgresStore::migrate`)
//!
//! Handlers only see the [`SnippetStore`] and [`UserStore`] traits. Production
//! wires in the `PostgreSQL` implementations; tests use the in-memory ones.
//!
//! # Migrations
//!
//! Stored in `crates/web/migrations/` and applied at startup.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use snippetbox_core::{Email, SnippetId, UserId};

use crate::models::Snippet;

pub mod memory;
pub mod password;
pub mod snippets;
pub mod users;

pub use memory::{MemorySnippetStore, MemoryUserStore};
pub use snippets::PgSnippetStore;
pub use users::PgUserStore;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found (or has expired).
    #[error("not found")]
    NotFound,

    /// An account with this email already exists.
    #[error("duplicate email")]
    DuplicateEmail,

    /// Email or password did not match a stored account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,
}

/// Snippet persistence.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Insert a snippet that expires `expires_days` days from now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<SnippetId, RepositoryError>;

    /// Fetch an unexpired snippet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no unexpired snippet has this ID.
    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError>;

    /// The most recently created unexpired snippets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError>;
}

/// User account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account, hashing the password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DuplicateEmail` if the email is taken.
    async fn insert(&self, name: &str, email: &Email, password: &str)
    -> Result<(), RepositoryError>;

    /// Check credentials and return the matching user ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidCredentials` for an unknown email or wrong password.
    async fn authenticate(&self, email: &Email, password: &str)
    -> Result<UserId, RepositoryError>;

    /// Whether a user with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
