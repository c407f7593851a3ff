//! Error types for the session layer.

use palaver_store::StoreError;

/// Errors that can occur during session registration and authentication.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A connected session already holds this display name.
    /// Subscribing checks and inserts under one critical section, so two
    /// racing authentications for the same name produce exactly one winner.
    #[error("display name \"{0}\" is already in use")]
    NameAlreadyBusy(String),

    /// No connected session holds this display name.
    #[error("no connected user named \"{0}\"")]
    UserNotFound(String),

    /// No user matches the presented login/password pair. A missing match
    /// is this typed failure — never a field read off an absent record.
    #[error("invalid login or password")]
    InvalidCredentials,

    /// Registration input failed the length rules
    /// (login ≥ 3, password ≥ 6, name ≥ 2 characters, trimmed).
    #[error("login, password or name does not meet the length requirements")]
    ValidationFailed,

    /// The login is already registered to a known user.
    #[error("login \"{0}\" is already taken")]
    LoginTaken(String),

    /// The display name is already registered to a known user.
    #[error("name \"{0}\" is already taken")]
    NameTaken(String),

    /// The backing user store failed. Surfaced to the requesting client as
    /// a generic failure; in-memory state is left untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}
