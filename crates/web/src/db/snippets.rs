//! `PostgreSQL` snippet store.

use async_trait::async_trait;
use sqlx::PgPool;

use snippetbox_core::SnippetId;

use super::{RepositoryError, SnippetStore};
use crate::models::Snippet;

/// Snippet store backed by the `snippets` table.
#[derive(Debug, Clone)]
pub struct PgSnippetStore {
    pool: PgPool,
}

impl PgSnippetStore {
    /// Create a new snippet store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for PgSnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<SnippetId, RepositoryError> {
        let id = sqlx::query_scalar::<_, SnippetId>(
            r"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, NOW(), NOW() + make_interval(days => $3))
            RETURNING id
            ",
        )
        .bind(title)
        .bind(content)
        .bind(expires_days)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError> {
        sqlx::query_as::<_, Snippet>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW() AND id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError> {
        let snippets = sqlx::query_as::<_, Snippet>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW()
            ORDER BY id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(snippets)
    }
}
