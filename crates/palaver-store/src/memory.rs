//! In-memory [`UserStore`] implementation.

use std::sync::Mutex;

use crate::{RoleKind, StoreError, User, UserId, UserStore};

/// A `UserStore` backed by a plain in-process vector.
///
/// This is the reference implementation used by the demo server and the
/// test suites. Nothing survives a restart; real deployments implement
/// [`UserStore`] over their own backend.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with the given users.
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    fn next_id(users: &[User]) -> UserId {
        UserId(users.iter().map(|u| u.id.0).max().map_or(1, |max| max + 1))
    }
}

impl UserStore for MemoryUserStore {
    fn load_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    fn insert(
        &self,
        login: &str,
        password: &str,
        name: &str,
        role: RoleKind,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let id = Self::next_id(&users);
        users.push(User::new(id, login, password, name, [role]));
        tracing::debug!(%id, login, "user persisted");
        Ok(())
    }

    fn rename(&self, id: UserId, new_name: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::UserMissing(id))?;
        user.display_name = new_name.to_string();
        Ok(())
    }

    fn add_role(&self, id: UserId, role: RoleKind) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::UserMissing(id))?;
        user.roles.insert(role);
        Ok(())
    }

    fn remove_role(
        &self,
        id: UserId,
        role: RoleKind,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::UserMissing(id))?;
        user.roles.remove(&role);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = MemoryUserStore::new();
        store
            .insert("alice", "secret123", "alice", RoleKind::User)
            .unwrap();
        store
            .insert("bob", "secret456", "bob", RoleKind::User)
            .unwrap();

        let users = store.load_all().unwrap();
        assert_eq!(users[0].id, UserId(1));
        assert_eq!(users[1].id, UserId(2));
    }

    #[test]
    fn test_insert_continues_after_seeded_ids() {
        let store = MemoryUserStore::with_users(vec![User::new(
            UserId(7),
            "carol",
            "secret123",
            "carol",
            [RoleKind::User],
        )]);
        store
            .insert("dave", "secret123", "dave", RoleKind::User)
            .unwrap();

        let users = store.load_all().unwrap();
        assert_eq!(users[1].id, UserId(8));
    }

    #[test]
    fn test_rename_updates_display_name() {
        let store = MemoryUserStore::new();
        store
            .insert("alice", "secret123", "alice", RoleKind::User)
            .unwrap();

        store.rename(UserId(1), "alicia").unwrap();

        assert_eq!(store.load_all().unwrap()[0].display_name, "alicia");
    }

    #[test]
    fn test_rename_unknown_user_returns_missing() {
        let store = MemoryUserStore::new();
        let result = store.rename(UserId(99), "ghost");
        assert!(matches!(result, Err(StoreError::UserMissing(UserId(99)))));
    }

    #[test]
    fn test_add_and_remove_role_round_trip() {
        let store = MemoryUserStore::new();
        store
            .insert("alice", "secret123", "alice", RoleKind::User)
            .unwrap();

        store.add_role(UserId(1), RoleKind::Admin).unwrap();
        assert!(store.load_all().unwrap()[0].is_admin());

        store.remove_role(UserId(1), RoleKind::Admin).unwrap();
        assert!(!store.load_all().unwrap()[0].is_admin());
    }

    #[test]
    fn test_load_all_returns_a_snapshot() {
        let store = MemoryUserStore::new();
        store
            .insert("alice", "secret123", "alice", RoleKind::User)
            .unwrap();

        let mut snapshot = store.load_all().unwrap();
        snapshot[0].display_name = "mutated".to_string();

        assert_eq!(store.load_all().unwrap()[0].display_name, "alice");
    }
}
