//! Snippetbox Core - Shared types library.
//!
//! Types shared by the web binary and its integration tests:
//!
//! - [`UserId`] and [`SnippetId`] - type-safe entity IDs
//! - [`Email`] - validated email address
//!
//! The crate has no I/O. `sqlx` support for the ID types is behind the
//! `postgres` feature.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
