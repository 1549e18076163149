//! Session-related types.

/// Session keys used by the request pipeline and handlers.
pub mod keys {
    /// ID of the logged-in user. Re-validated against the user store on every request.
    pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

    /// One-shot message shown on the next rendered page.
    pub const FLASH: &str = "flash";

    /// Per-session CSRF secret.
    pub const CSRF_SECRET: &str = "csrfSecret";
}
