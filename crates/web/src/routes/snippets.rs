//! Snippet route handlers.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use snippetbox_core::SnippetId;

use crate::error::{AppError, Result};
use crate::forms::{FormErrors, decode_form, max_chars, not_blank, permitted_value};
use crate::models::session_keys;
use crate::render::{FormView, RequestScope, TemplateData};
use crate::state::AppState;

/// Lifetimes, in days, a snippet may be created with.
const PERMITTED_EXPIRES: [i32; 3] = [1, 7, 365];

const MAX_TITLE_CHARS: usize = 100;

// =============================================================================
// Form Types
// =============================================================================

/// New snippet form data.
#[derive(Debug, Default, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expires: String,
}

impl SnippetCreateForm {
    /// Validate the form, returning the parsed lifetime in days.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if `expires` is not an integer; other
    /// problems are reported through `FormErrors`.
    fn validate(&self) -> Result<(i32, FormErrors)> {
        let expires = self
            .expires
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::BadRequest(format!("invalid expires: {}", self.expires)))?;

        let mut errors = FormErrors::new();
        errors.check_field(not_blank(&self.title), "title", "This field cannot be blank");
        errors.check_field(
            max_chars(&self.title, MAX_TITLE_CHARS),
            "title",
            "This field cannot be more than 100 characters long",
        );
        errors.check_field(
            not_blank(&self.content),
            "content",
            "This field cannot be blank",
        );
        errors.check_field(
            permitted_value(&expires, &PERMITTED_EXPIRES),
            "expires",
            "This field must equal 1, 7 or 365",
        );

        Ok((expires, errors))
    }

    fn view(&self, errors: FormErrors) -> FormView {
        FormView::new(
            [
                ("title", self.title.as_str()),
                ("content", self.content.as_str()),
                ("expires", self.expires.as_str()),
            ],
            errors,
        )
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display a single snippet.
///
/// IDs that are not positive integers are treated like unknown snippets;
/// both answer 404.
#[instrument(skip(state, scope))]
pub async fn view(
    State(state): State<AppState>,
    scope: RequestScope,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = SnippetId::parse_positive(&id).ok_or(AppError::NotFound)?;

    let snippet = state.snippets().get(id).await?;

    let data = TemplateData::new(&scope.context().await?).with_snippet(&snippet);
    state.renderer().render(StatusCode::OK, "view.html", &data)
}

/// Display the new snippet form.
#[instrument(skip(state, scope))]
pub async fn create_page(State(state): State<AppState>, scope: RequestScope) -> Result<Response> {
    let form = FormView::new([("expires", "365")], FormErrors::new());

    let data = TemplateData::new(&scope.context().await?).with_form(form);
    state.renderer().render(StatusCode::OK, "create.html", &data)
}

/// Handle new snippet submission.
#[instrument(skip(state, scope, body))]
pub async fn create(
    State(state): State<AppState>,
    scope: RequestScope,
    body: Bytes,
) -> Result<Response> {
    let form: SnippetCreateForm = decode_form(&body)?;
    let (expires, errors) = form.validate()?;

    if !errors.is_valid() {
        let data = TemplateData::new(&scope.context().await?).with_form(form.view(errors));
        return state
            .renderer()
            .render(StatusCode::UNPROCESSABLE_ENTITY, "create.html", &data);
    }

    let id = state
        .snippets()
        .insert(&form.title, &form.content, expires)
        .await?;
    tracing::info!(snippet_id = %id, "Snippet created");

    scope
        .session
        .put(session_keys::FLASH, "Snippet successfully created!")
        .await?;

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
