//! Signup, login and logout route handlers.
//!
//! Login and logout change the privilege level of the session, so both
//! renew the session token before touching `authenticatedUserID`.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use snippetbox_core::Email;

use crate::db::RepositoryError;
use crate::error::Result;
use crate::forms::{FormErrors, decode_form, min_chars, not_blank, valid_email};
use crate::models::session_keys;
use crate::render::{FormView, RequestScope, TemplateData};
use crate::state::AppState;

const MIN_PASSWORD_CHARS: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Signup form data.
#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        errors.check_field(not_blank(&self.name), "name", "This field cannot be blank");
        errors.check_field(not_blank(&self.email), "email", "This field cannot be blank");
        errors.check_field(
            valid_email(&self.email),
            "email",
            "This field must be a valid email address",
        );
        errors.check_field(
            not_blank(&self.password),
            "password",
            "This field cannot be blank",
        );
        errors.check_field(
            min_chars(&self.password, MIN_PASSWORD_CHARS),
            "password",
            "This field must be at least 8 characters long",
        );
        errors
    }

    /// Password is never echoed back.
    fn view(&self, errors: FormErrors) -> FormView {
        FormView::new(
            [("name", self.name.as_str()), ("email", self.email.as_str())],
            errors,
        )
    }
}

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        errors.check_field(not_blank(&self.email), "email", "This field cannot be blank");
        errors.check_field(
            valid_email(&self.email),
            "email",
            "This field must be a valid email address",
        );
        errors.check_field(
            not_blank(&self.password),
            "password",
            "This field cannot be blank",
        );
        errors
    }

    fn view(&self, errors: FormErrors) -> FormView {
        FormView::new([("email", self.email.as_str())], errors)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the signup form.
#[instrument(skip(state, scope))]
pub async fn signup_page(State(state): State<AppState>, scope: RequestScope) -> Result<Response> {
    let data = TemplateData::new(&scope.context().await?);
    state.renderer().render(StatusCode::OK, "signup.html", &data)
}

/// Handle signup form submission.
#[instrument(skip(state, scope, body))]
pub async fn signup(
    State(state): State<AppState>,
    scope: RequestScope,
    body: Bytes,
) -> Result<Response> {
    let form: SignupForm = decode_form(&body)?;
    let mut errors = form.validate();

    if errors.is_valid() {
        match Email::parse(&form.email) {
            Ok(email) => match state.users().insert(&form.name, &email, &form.password).await {
                Ok(()) => {
                    tracing::info!("User signed up");
                    scope
                        .session
                        .put(
                            session_keys::FLASH,
                            "Your signup was successful. Please log in.",
                        )
                        .await?;
                    return Ok(Redirect::to("/user/login").into_response());
                }
                Err(RepositoryError::DuplicateEmail) => {
                    errors.add_field_error("email", "Email address is already in use");
                }
                Err(e) => return Err(e.into()),
            },
            Err(_) => {
                errors.add_field_error("email", "This field must be a valid email address");
            }
        }
    }

    let data = TemplateData::new(&scope.context().await?).with_form(form.view(errors));
    state
        .renderer()
        .render(StatusCode::UNPROCESSABLE_ENTITY, "signup.html", &data)
}

/// Display the login form.
#[instrument(skip(state, scope))]
pub async fn login_page(State(state): State<AppState>, scope: RequestScope) -> Result<Response> {
    let data = TemplateData::new(&scope.context().await?);
    state.renderer().render(StatusCode::OK, "login.html", &data)
}

/// Handle login form submission.
///
/// On success the session token is renewed before the user ID is stored, so
/// a token planted before login never becomes an authenticated one.
#[instrument(skip(state, scope, body))]
pub async fn login(
    State(state): State<AppState>,
    scope: RequestScope,
    body: Bytes,
) -> Result<Response> {
    let form: LoginForm = decode_form(&body)?;
    let mut errors = form.validate();

    if errors.is_valid() {
        let authenticated = match Email::parse(&form.email) {
            Ok(email) => state.users().authenticate(&email, &form.password).await,
            Err(_) => Err(RepositoryError::InvalidCredentials),
        };

        match authenticated {
            Ok(user_id) => {
                scope.session.renew_token().await?;
                scope
                    .session
                    .put(session_keys::AUTHENTICATED_USER_ID, user_id)
                    .await?;
                tracing::info!(user_id = %user_id, "User logged in");
                return Ok(Redirect::to("/snippet/create").into_response());
            }
            Err(RepositoryError::InvalidCredentials) => {
                errors.add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = TemplateData::new(&scope.context().await?).with_form(form.view(errors));
    state
        .renderer()
        .render(StatusCode::UNPROCESSABLE_ENTITY, "login.html", &data)
}

/// Log out and return to the home page.
#[instrument(skip(scope))]
pub async fn logout(scope: RequestScope) -> Result<Response> {
    scope.session.renew_token().await?;
    scope
        .session
        .remove(session_keys::AUTHENTICATED_USER_ID)
        .await?;
    scope
        .session
        .put(session_keys::FLASH, "You've been logged out successfully!")
        .await?;

    tracing::info!(user_id = ?scope.auth.user_id(), "User logged out");
    Ok(Redirect::to("/").into_response())
}
