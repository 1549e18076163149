//! Snippetbox web application.
//!
//! The binary in `main.rs` only wires configuration, stores and the listener
//! together; everything reachable from a request lives here so the
//! integration tests can drive the full pipeline in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod routes;
pub mod state;

pub use pipeline::app;
pub use state::AppState;
