//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{SnippetStore, UserStore};
use crate::middleware::SessionManager;
use crate::render::Renderer;

/// Dependencies every handler and middleware can reach.
///
/// Built once at startup and cloned into the router; cloning is an `Arc` bump.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    snippets: Arc<dyn SnippetStore>,
    users: Arc<dyn UserStore>,
    renderer: Renderer,
    sessions: SessionManager,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `snippets` - Snippet store
    /// * `users` - User store
    /// * `renderer` - Renderer over the startup-built template cache
    #[must_use]
    pub fn new(
        config: AppConfig,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        renderer: Renderer,
    ) -> Self {
        let sessions = SessionManager::from_config(&config);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                snippets,
                users,
                renderer,
                sessions,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn snippets(&self) -> &dyn SnippetStore {
        self.inner.snippets.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn renderer(&self) -> &Renderer {
        &self.inner.renderer
    }

    /// Session cookie policy.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }
}
