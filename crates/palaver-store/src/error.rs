use crate::UserId;

/// Errors that can occur in a user store backend.
///
/// Store failures are surfaced to the requesting client as a generic
/// failure; callers apply in-memory mutations only after the store call
/// succeeds.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced user record does not exist in the store.
    #[error("user {0} is not present in the store")]
    UserMissing(UserId),

    /// The backend itself failed (connection, I/O, constraint violation).
    #[error("user store backend failure: {0}")]
    Backend(String),
}
