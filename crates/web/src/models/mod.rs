//! Domain models for Snippetbox.

pub mod session;
pub mod snippet;

pub use session::keys as session_keys;
pub use snippet::Snippet;
