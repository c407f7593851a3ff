//! User-store-backed [`AuthProvider`].

use std::sync::{Arc, RwLock};

use palaver_store::{RoleKind, SharedUser, User, UserId, UserStore};

use crate::{AuthProvider, SessionError};

/// The stock authentication provider: an in-memory cache of every known
/// user, warmed from a [`UserStore`] at construction and kept in sync as
/// registrations come in.
///
/// Sessions receive [`SharedUser`] handles out of this cache, so renames
/// and role changes made through one session are immediately visible to
/// every reader of that identity.
pub struct StoreAuthProvider<S> {
    store: Arc<S>,
    users: RwLock<Vec<SharedUser>>,
}

impl<S: UserStore> StoreAuthProvider<S> {
    /// Loads the user cache from the store.
    pub fn new(store: Arc<S>) -> Result<Self, SessionError> {
        let users = store
            .load_all()?
            .into_iter()
            .map(User::into_shared)
            .collect();
        Ok(Self {
            store,
            users: RwLock::new(users),
        })
    }

    fn next_user_id(users: &[SharedUser]) -> UserId {
        UserId(
            users
                .iter()
                .map(|u| u.read().unwrap().id.0)
                .max()
                .map_or(1, |max| max + 1),
        )
    }
}

impl<S: UserStore> AuthProvider for StoreAuthProvider<S> {
    fn initialize(&self) {
        tracing::info!(
            users = self.users.read().unwrap().len(),
            "authentication provider ready (user store mode)"
        );
    }

    async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<SharedUser, SessionError> {
        self.users
            .read()
            .unwrap()
            .iter()
            .find(|u| {
                let u = u.read().unwrap();
                u.login == login && u.password == password
            })
            .cloned()
            .ok_or(SessionError::InvalidCredentials)
    }

    async fn register(
        &self,
        login: &str,
        password: &str,
        name: &str,
        role: RoleKind,
    ) -> Result<SharedUser, SessionError> {
        if login.trim().chars().count() < 3
            || password.trim().chars().count() < 6
            || name.trim().chars().count() < 2
        {
            return Err(SessionError::ValidationFailed);
        }

        let mut users = self.users.write().unwrap();

        if users.iter().any(|u| u.read().unwrap().login == login) {
            return Err(SessionError::LoginTaken(login.to_string()));
        }
        if users.iter().any(|u| u.read().unwrap().display_name == name) {
            return Err(SessionError::NameTaken(name.to_string()));
        }

        // Persist before touching the cache, so a store failure leaves
        // nothing half-applied.
        self.store.insert(login, password, name, role)?;

        let id = Self::next_user_id(&users);
        let user = User::new(id, login, password, name, [role]).into_shared();
        users.push(Arc::clone(&user));

        tracing::info!(%id, login, name, "user registered");
        Ok(user)
    }
}
