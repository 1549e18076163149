//! Page rendering.
//!
//! Pages are askama templates compiled into the binary. [`TemplateCache`]
//! maps each page name to its render function and is built once at startup;
//! [`Renderer::render`] renders into a `String` first and only then builds
//! the response, so a template failure yields a clean 500 rather than a
//! success status with a truncated body.

use std::collections::HashMap;
use std::sync::Arc;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::error::AppError;

pub mod context;
pub mod data;

pub use context::{RequestContext, RequestScope};
pub use data::{FormView, SnippetView, TemplateData, human_date};

/// Template lookup or execution failure.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("the template {0} does not exist")]
    MissingTemplate(String),

    #[error("failed to render {page}: {source}")]
    Execution {
        page: String,
        #[source]
        source: askama::Error,
    },
}

type PageFn = fn(&TemplateData) -> askama::Result<String>;

#[derive(Template)]
#[template(path = "pages/home.html")]
struct HomePage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/view.html")]
struct ViewPage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/create.html")]
struct CreatePage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
struct SignupPage<'a> {
    data: &'a TemplateData,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginPage<'a> {
    data: &'a TemplateData,
}

/// Immutable page name to template mapping.
pub struct TemplateCache {
    pages: HashMap<&'static str, PageFn>,
}

impl TemplateCache {
    /// Build the cache and render every page once against empty data.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Execution` if any page fails to render.
    pub fn new() -> Result<Self, RenderError> {
        let pages: [(&'static str, PageFn); 5] = [
            ("home.html", |data| HomePage { data }.render()),
            ("view.html", |data| ViewPage { data }.render()),
            ("create.html", |data| CreatePage { data }.render()),
            ("signup.html", |data| SignupPage { data }.render()),
            ("login.html", |data| LoginPage { data }.render()),
        ];
        let cache = Self {
            pages: pages.into_iter().collect(),
        };

        let empty = TemplateData::default();
        for page in cache.pages.keys() {
            cache.render(page, &empty)?;
        }

        Ok(cache)
    }

    /// Names of all registered pages.
    pub fn pages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pages.keys().copied()
    }

    /// Render `page` to a string.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::MissingTemplate` for an unknown page and
    /// `RenderError::Execution` if the template fails.
    pub fn render(&self, page: &str, data: &TemplateData) -> Result<String, RenderError> {
        let render = self
            .pages
            .get(page)
            .ok_or_else(|| RenderError::MissingTemplate(page.to_string()))?;

        render(data).map_err(|source| RenderError::Execution {
            page: page.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("pages", &self.pages.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Renders pages from a shared [`TemplateCache`].
#[derive(Debug, Clone)]
pub struct Renderer {
    cache: Arc<TemplateCache>,
}

impl Renderer {
    #[must_use]
    pub fn new(cache: TemplateCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Render `page` with `status`.
    ///
    /// The status is only committed once the whole page rendered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Render` if the page is missing or fails to render.
    pub fn render(
        &self,
        status: StatusCode,
        page: &str,
        data: &TemplateData,
    ) -> Result<Response, AppError> {
        let body = self.cache.render(page, data)?;
        Ok((status, Html(body)).into_response())
    }
}
