//! Data handed to page templates.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use super::context::RequestContext;
use crate::forms::FormErrors;
use crate::models::Snippet;

/// Everything a page template can read.
///
/// Built from a [`RequestContext`] plus whatever the handler adds. Templates
/// never see `Option`s for the common fields; an absent flash is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: String,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<SnippetView>,
    pub snippets: Vec<SnippetView>,
    pub form: FormView,
}

impl TemplateData {
    /// Template data carrying the request's context and the current year.
    #[must_use]
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            current_year: Utc::now().year(),
            flash: ctx.flash.clone().unwrap_or_default(),
            is_authenticated: ctx.is_authenticated,
            csrf_token: ctx.csrf_token.clone(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_snippet(mut self, snippet: &Snippet) -> Self {
        self.snippet = Some(SnippetView::from(snippet));
        self
    }

    #[must_use]
    pub fn with_snippets(mut self, snippets: &[Snippet]) -> Self {
        self.snippets = snippets.iter().map(SnippetView::from).collect();
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: FormView) -> Self {
        self.form = form;
        self
    }
}

/// A snippet with display-ready dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

impl From<&Snippet> for SnippetView {
    fn from(snippet: &Snippet) -> Self {
        Self {
            id: snippet.id.as_i32(),
            title: snippet.title.clone(),
            content: snippet.content.clone(),
            created: human_date(snippet.created),
            expires: human_date(snippet.expires),
        }
    }
}

/// Format a timestamp like `17 Mar 2024 at 10:15` (UTC).
#[must_use]
pub fn human_date(t: DateTime<Utc>) -> String {
    t.format("%d %b %Y at %H:%M").to_string()
}

/// Submitted values and validation messages for re-displaying a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormView {
    values: BTreeMap<String, String>,
    field_errors: BTreeMap<String, String>,
    non_field_errors: Vec<String>,
}

impl FormView {
    /// A form pre-filled with `values` and carrying `errors`.
    #[must_use]
    pub fn new<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>, errors: FormErrors) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            field_errors: errors.field_errors().clone(),
            non_field_errors: errors.non_field_errors().to_vec(),
        }
    }

    /// The submitted value of `field`, or `""`.
    #[must_use]
    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// The error message for `field`, or `""`.
    #[must_use]
    pub fn error(&self, field: &str) -> &str {
        self.field_errors.get(field).map_or("", String::as_str)
    }

    #[must_use]
    pub fn has_error(&self, field: &str) -> bool {
        self.field_errors.contains_key(field)
    }

    #[must_use]
    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_human_date() {
        let t = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(human_date(t), "07 Mar 2024 at 09:05");
    }

    #[test]
    fn test_new_copies_context() {
        let ctx = RequestContext {
            is_authenticated: true,
            csrf_token: "tok".to_string(),
            flash: Some("Hello".to_string()),
        };
        let data = TemplateData::new(&ctx);
        assert!(data.is_authenticated);
        assert_eq!(data.csrf_token, "tok");
        assert_eq!(data.flash, "Hello");
        assert!(data.current_year >= 2024);
    }

    #[test]
    fn test_form_view_lookup() {
        let mut errors = FormErrors::new();
        errors.add_field_error("title", "This field cannot be blank");
        let form = FormView::new([("title", ""), ("expires", "7")], errors);

        assert_eq!(form.value("expires"), "7");
        assert_eq!(form.value("missing"), "");
        assert!(form.has_error("title"));
        assert_eq!(form.error("title"), "This field cannot be blank");
        assert_eq!(form.error("content"), "");
    }
}
