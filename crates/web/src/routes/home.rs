//! Home page route handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
};
use tracing::instrument;

use crate::error::Result;
use crate::render::{RequestScope, TemplateData};
use crate::state::AppState;

/// Number of snippets listed on the home page.
const LATEST_LIMIT: i64 = 10;

/// Display the latest unexpired snippets.
#[instrument(skip(state, scope))]
pub async fn home(State(state): State<AppState>, scope: RequestScope) -> Result<Response> {
    let snippets = state.snippets().latest(LATEST_LIMIT).await?;

    let data = TemplateData::new(&scope.context().await?).with_snippets(&snippets);
    state.renderer().render(StatusCode::OK, "home.html", &data)
}
