//! The persistence seam.

use crate::{RoleKind, StoreError, User, UserId};

/// Persists user records and their role assignments.
///
/// Every operation is synchronous and must be safe to call from any
/// connection's task; the core never spans a transaction across calls.
/// Implementations decide their own id assignment — callers pass logical
/// data only.
pub trait UserStore: Send + Sync + 'static {
    /// Loads every known user. Called once at startup to warm the
    /// authentication cache.
    fn load_all(&self) -> Result<Vec<User>, StoreError>;

    /// Persists a new user with a single initial role.
    fn insert(
        &self,
        login: &str,
        password: &str,
        name: &str,
        role: RoleKind,
    ) -> Result<(), StoreError>;

    /// Changes a user's display name.
    fn rename(&self, id: UserId, new_name: &str) -> Result<(), StoreError>;

    /// Grants a role to a user.
    fn add_role(&self, id: UserId, role: RoleKind) -> Result<(), StoreError>;

    /// Revokes a role from a user.
    fn remove_role(&self, id: UserId, role: RoleKind)
        -> Result<(), StoreError>;
}
