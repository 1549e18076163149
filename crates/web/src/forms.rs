//! Form decoding and validation.
//!
//! [`decode_form`] turns an `application/x-www-form-urlencoded` body into a
//! handler's form struct. A struct that cannot be built from flat string
//! pairs at all (say, a bare string or number) is a programming mistake and is
//! reported as [`FormError::InvalidTarget`], a server error; a body that
//! does not fit the struct is the client's fault and becomes a 400.
//!
//! [`FormErrors`] collects per-field and form-wide validation failures for
//! re-rendering the form with `422 Unprocessable Entity`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, DeserializeOwned, Expected, Unexpected, value::MapDeserializer};
use thiserror::Error;

use snippetbox_core::Email;

/// Largest urlencoded body accepted, matching axum's default body limit.
pub const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// Form decoding failure.
#[derive(Debug, Error)]
pub enum FormError {
    /// The body does not match the form's fields.
    #[error("malformed form: {0}")]
    Malformed(String),

    /// The target type cannot be decoded from form data.
    #[error("invalid decode target: {0}")]
    InvalidTarget(String),
}

/// Decode a urlencoded body into `T`.
///
/// Repeated keys keep the last value. Unknown keys (such as the CSRF token)
/// are ignored unless `T` denies them.
///
/// # Errors
///
/// Returns `FormError::InvalidTarget` when `T` cannot be read from a map,
/// and `FormError::Malformed` when the body is over [`MAX_FORM_BYTES`] or
/// does not fit `T`.
pub fn decode_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, FormError> {
    if body.len() > MAX_FORM_BYTES {
        return Err(FormError::Malformed(format!(
            "body of {} bytes exceeds {MAX_FORM_BYTES}",
            body.len()
        )));
    }

    let pairs: BTreeMap<String, String> = url::form_urlencoded::parse(body)
        .into_owned()
        .collect();

    let deserializer = MapDeserializer::<_, DecodeError>::new(pairs.into_iter());

    T::deserialize(deserializer).map_err(|e| match e {
        DecodeError::NotAMap(message) => {
            FormError::InvalidTarget(format!("{}: {message}", std::any::type_name::<T>()))
        }
        DecodeError::Field(message) => FormError::Malformed(message),
    })
}

/// Deserializer error that keeps "the whole form was offered to a non-map
/// type" apart from field-level mismatches.
#[derive(Debug, Error)]
enum DecodeError {
    #[error("{0}")]
    NotAMap(String),

    #[error("{0}")]
    Field(String),
}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Field(msg.to_string())
    }

    fn invalid_type(unexp: Unexpected<'_>, exp: &dyn Expected) -> Self {
        let message = format!("invalid type: {unexp}, expected {exp}");
        if unexp == Unexpected::Map {
            Self::NotAMap(message)
        } else {
            Self::Field(message)
        }
    }
}

/// Validation failures for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    field_errors: BTreeMap<String, String>,
    non_field_errors: Vec<String>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record an error for `field` unless it already has one.
    pub fn add_field_error(&mut self, field: &str, message: &str) {
        self.field_errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record an error about the submission as a whole.
    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field_errors.push(message.to_string());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    #[must_use]
    pub const fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    #[must_use]
    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

/// True if `value` has non-whitespace content.
#[must_use]
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if `value` has at most `n` characters.
#[must_use]
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True if `value` has at least `n` characters.
#[must_use]
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True if `value` is one of `permitted`.
#[must_use]
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// True if `value` is a well-formed email address.
#[must_use]
pub fn valid_email(value: &str) -> bool {
    Email::parse(value).is_ok()
}
