//! Snippet model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use snippetbox_core::SnippetId;

/// A stored text snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}
