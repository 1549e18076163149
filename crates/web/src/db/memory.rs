//! In-memory stores for tests and local experiments.
//!
//! Both stores are safe to share across tasks; every operation takes a
//! short-lived lock on a `tokio::sync::RwLock`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use snippetbox_core::{Email, SnippetId, UserId};

use super::password::{hash_password, verify_password};
use super::{RepositoryError, SnippetStore, UserStore};
use crate::models::Snippet;

/// Snippet store held in process memory.
#[derive(Debug, Default)]
pub struct MemorySnippetStore {
    inner: RwLock<BTreeMap<SnippetId, Snippet>>,
}

impl MemorySnippetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snippets, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store holds no snippets.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<SnippetId, RepositoryError> {
        let mut snippets = self.inner.write().await;
        let next = snippets.keys().next_back().map_or(1, |id| id.as_i32() + 1);
        let id = SnippetId::new(next);
        let created = Utc::now();

        snippets.insert(
            id,
            Snippet {
                id,
                title: title.to_owned(),
                content: content.to_owned(),
                created,
                expires: created + Duration::days(i64::from(expires_days)),
            },
        );

        Ok(id)
    }

    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError> {
        self.inner
            .read()
            .await
            .get(&id)
            .filter(|s| s.expires > Utc::now())
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError> {
        let now = Utc::now();
        let take = usize::try_from(limit).unwrap_or(0);

        Ok(self
            .inner
            .read()
            .await
            .values()
            .rev()
            .filter(|s| s.expires > now)
            .take(take)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    id: UserId,
    name: String,
    email: Email,
    hashed_password: String,
}

/// User store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<Vec<StoredUser>>,
    next_id: RwLock<i32>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name of a stored user.
    pub async fn name(&self, id: UserId) -> Option<String> {
        self.inner
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.name.clone())
    }

    /// Delete a user, leaving any sessions that reference it in place.
    pub async fn remove(&self, id: UserId) {
        self.inner.write().await.retain(|u| u.id != id);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<(), RepositoryError> {
        let hashed_password = hash_password(password)?;
        let mut users = self.inner.write().await;

        if users.iter().any(|u| u.email == *email) {
            return Err(RepositoryError::DuplicateEmail);
        }

        let mut next_id = self.next_id.write().await;
        *next_id += 1;
        users.push(StoredUser {
            id: UserId::new(*next_id),
            name: name.to_string(),
            email: email.clone(),
            hashed_password,
        });

        Ok(())
    }

    async fn authenticate(&self, email: &Email, password: &str) -> Result<UserId, RepositoryError> {
        let user = self
            .inner
            .read()
            .await
            .iter()
            .find(|u| u.email == *email)
            .cloned()
            .ok_or(RepositoryError::InvalidCredentials)?;

        verify_password(password, &user.hashed_password)?;
        Ok(user.id)
    }

    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.inner.read().await.iter().any(|u| u.id == id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snippet_ids_start_at_one() {
        let store = MemorySnippetStore::new();
        let first = store.insert("a", "b", 7).await.unwrap();
        let second = store.insert("c", "d", 7).await.unwrap();
        assert_eq!(first, SnippetId::new(1));
        assert_eq!(second, SnippetId::new(2));
    }

    #[tokio::test]
    async fn test_get_missing_snippet_is_not_found() {
        let store = MemorySnippetStore::new();
        assert!(matches!(
            store.get(SnippetId::new(9)).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_snippets_are_hidden() {
        let store = MemorySnippetStore::new();
        let id = store.insert("old", "gone", -1).await.unwrap();
        assert!(matches!(store.get(id).await, Err(RepositoryError::NotFound)));
        assert!(store.latest(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_is_newest_first_and_limited() {
        let store = MemorySnippetStore::new();
        for i in 0..4 {
            store.insert(&format!("s{i}"), "x", 1).await.unwrap();
        }
        let latest = store.latest(3).await.unwrap();
        let titles: Vec<_> = latest.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["s3", "s2", "s1"]);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let store = MemoryUserStore::new();
        let email = Email::parse("alice@example.com").unwrap();
        store.insert("Alice", &email, "pa$$word").await.unwrap();

        assert!(matches!(
            store.insert("Alice again", &email, "other-pass").await,
            Err(RepositoryError::DuplicateEmail)
        ));

        let id = store.authenticate(&email, "pa$$word").await.unwrap();
        assert!(store.exists(id).await.unwrap());
        assert_eq!(store.name(id).await.as_deref(), Some("Alice"));
        assert!(matches!(
            store.authenticate(&email, "wrong-pass").await,
            Err(RepositoryError::InvalidCredentials)
        ));

        store.remove(id).await;
        assert!(!store.exists(id).await.unwrap());
        assert_eq!(store.name(id).await, None);
    }
}
