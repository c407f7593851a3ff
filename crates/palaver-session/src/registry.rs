//! The session registry: the single source of truth for who is online.
//!
//! Every compound operation — check-then-insert on subscribe, the re-key on
//! rename, lookup-then-act on kick — runs under the registry's one internal
//! lock, so concurrent authentications, renames, and terminations cannot
//! interleave inside them. The raw map is never exposed.
//!
//! No frame is ever sent while the lock is held: operations that need to
//! notify a session take an `Arc<Session>` snapshot under the lock and send
//! after releasing it (sends are channel enqueues and never block on the
//! network anyway, but the rule keeps the critical sections minimal).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use palaver_protocol::tokens;
use palaver_store::{SharedUser, UserId};

use crate::{Session, SessionError};

/// Notice delivered to a session removed by an administrator.
const KICKED_NOTICE: &str =
    "You have been disconnected from the server by the administrator.";

/// Thread-safe mapping from display name to live session.
///
/// Key invariant: at most one registered session per display name. A
/// session appears here if and only if it is authenticated and its
/// transport is still open.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under its user's display name, storing the
    /// identity on the session in the same critical section.
    ///
    /// # Errors
    /// Returns [`SessionError::NameAlreadyBusy`] if a session with that
    /// name is already registered; the session's identity is then left
    /// unset so the handshake can retry.
    pub fn subscribe(
        &self,
        session: &Arc<Session>,
        user: SharedUser,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().unwrap();

        let name = user.read().unwrap().display_name.clone();
        if sessions.contains_key(&name) {
            return Err(SessionError::NameAlreadyBusy(name));
        }

        session.set_identity(user);
        session.mark_authenticated();
        sessions.insert(name.clone(), Arc::clone(session));

        tracing::info!(id = %session.id(), %name, "session subscribed");
        Ok(())
    }

    /// Removes a session. Idempotent: absent sessions, sessions that never
    /// authenticated, and names re-claimed by a newer session are all
    /// no-ops.
    pub fn unsubscribe(&self, session: &Session) {
        let mut sessions = self.sessions.lock().unwrap();

        if let Some(name) = session.display_name() {
            // Only remove the entry if it is this very session; a newer
            // session may have claimed the name after this one died.
            if sessions.get(&name).is_some_and(|s| s.id() == session.id()) {
                sessions.remove(&name);
                tracing::info!(id = %session.id(), %name, "session unsubscribed");
            }
        }
    }

    /// Looks up a live session by display name.
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(name).cloned()
    }

    /// Whether a live session holds the given display name.
    pub fn is_name_busy(&self, name: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(name)
    }

    /// The user id behind a display name, resolved in one critical section.
    pub fn user_id_by_name(&self, name: &str) -> Option<UserId> {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions.get(name)?;
        session.identity().map(|user| user.read().unwrap().id)
    }

    /// A sorted snapshot of every registered display name. Point-in-time
    /// only — the registry may change the moment the lock is released.
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.sessions.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// A snapshot of every registered session, for fan-out and sweeps.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }

    /// Atomically re-keys a session under a new display name and updates
    /// the shared user record.
    ///
    /// # Errors
    /// Returns [`SessionError::NameAlreadyBusy`] if another session holds
    /// the target name, and [`SessionError::UserNotFound`] if this session
    /// was never registered.
    pub fn rename(
        &self,
        session: &Arc<Session>,
        new_name: &str,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().unwrap();

        let Some(user) = session.identity() else {
            return Err(SessionError::UserNotFound(new_name.to_string()));
        };

        if sessions
            .get(new_name)
            .is_some_and(|other| other.id() != session.id())
        {
            return Err(SessionError::NameAlreadyBusy(new_name.to_string()));
        }

        let old_name = {
            let mut user = user.write().unwrap();
            let old = std::mem::replace(
                &mut user.display_name,
                new_name.to_string(),
            );
            old
        };

        sessions.remove(&old_name);
        sessions.insert(new_name.to_string(), Arc::clone(session));

        tracing::info!(id = %session.id(), %old_name, new_name, "session renamed");
        Ok(())
    }

    /// Forcibly disconnects the session holding the given name.
    ///
    /// The whole table is consulted before concluding absence — a
    /// non-matching entry never short-circuits into "not found". The
    /// notice, the exit acknowledgment, and the termination all happen
    /// after the lookup's critical section ends.
    ///
    /// # Errors
    /// Returns [`SessionError::UserNotFound`] if no session holds the name.
    pub fn kick(&self, name: &str) -> Result<(), SessionError> {
        let session = self
            .lookup_by_name(name)
            .ok_or_else(|| SessionError::UserNotFound(name.to_string()))?;

        session.send(KICKED_NOTICE);
        session.send(tokens::EXIT_OK);
        session.terminate(self);

        tracing::info!(name, "session kicked by administrator");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use palaver_store::{RoleKind, User};
    use palaver_transport::ConnectionId;
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::Outbound;

    fn session(id: u64) -> (Arc<Session>, UnboundedReceiver<Outbound>) {
        let (session, rx) = Session::new(ConnectionId::new(id));
        session.begin_authenticating();
        (session, rx)
    }

    fn user(id: u64, name: &str) -> SharedUser {
        User::new(UserId(id), name, "secret123", name, [RoleKind::User])
            .into_shared()
    }

    /// Drains a session's outbound queue into plain lines.
    fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item);
        }
        out
    }

    // =====================================================================
    // subscribe() / unsubscribe()
    // =====================================================================

    #[test]
    fn test_subscribe_registers_name_and_sets_identity() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);

        registry.subscribe(&s, user(1, "alice")).unwrap();

        assert!(registry.is_name_busy("alice"));
        assert_eq!(s.state(), crate::SessionState::Authenticated);
        assert_eq!(s.display_name().as_deref(), Some("alice"));
    }

    #[test]
    fn test_subscribe_duplicate_name_returns_busy() {
        let registry = SessionRegistry::new();
        let (first, _rx1) = session(1);
        let (second, _rx2) = session(2);

        registry.subscribe(&first, user(1, "alice")).unwrap();
        let result = registry.subscribe(&second, user(2, "alice"));

        assert!(matches!(
            result,
            Err(SessionError::NameAlreadyBusy(name)) if name == "alice"
        ));
        // The loser keeps no identity and can retry under another name.
        assert!(second.identity().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_subscribe_race_has_exactly_one_winner() {
        // Many threads authenticate the same display name concurrently;
        // the check-then-insert critical section must admit exactly one.
        let registry = Arc::new(SessionRegistry::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                let (s, _rx) = session(i);
                registry.subscribe(&s, user(i, "alice")).is_ok()
            }));
        }

        let winners: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unsubscribe_frees_the_name() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        registry.subscribe(&s, user(1, "alice")).unwrap();

        registry.unsubscribe(&s);

        assert!(registry.lookup_by_name("alice").is_none());

        // The freed name can be claimed again.
        let (next, _rx2) = session(2);
        registry.subscribe(&next, user(2, "alice")).unwrap();
        assert!(registry.is_name_busy("alice"));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        registry.subscribe(&s, user(1, "alice")).unwrap();

        registry.unsubscribe(&s);
        registry.unsubscribe(&s); // no-op, must not panic

        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_never_authenticated_is_a_no_op() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        registry.unsubscribe(&s);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_does_not_remove_a_newer_claimant() {
        let registry = SessionRegistry::new();
        let (old, _rx1) = session(1);
        registry.subscribe(&old, user(1, "alice")).unwrap();

        // The old session dies and a new one claims the name.
        registry.unsubscribe(&old);
        let (new, _rx2) = session(2);
        registry.subscribe(&new, user(2, "alice")).unwrap();

        // A late duplicate unsubscribe from the dead session must not
        // evict the new claimant.
        registry.unsubscribe(&old);
        assert!(registry.is_name_busy("alice"));
    }

    // =====================================================================
    // lookups
    // =====================================================================

    #[test]
    fn test_lookup_by_name_returns_the_session() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        registry.subscribe(&s, user(1, "alice")).unwrap();

        let found = registry.lookup_by_name("alice").unwrap();
        assert_eq!(found.id(), s.id());
        assert!(registry.lookup_by_name("bob").is_none());
    }

    #[test]
    fn test_user_id_by_name_resolves_through_identity() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        registry.subscribe(&s, user(42, "alice")).unwrap();

        assert_eq!(registry.user_id_by_name("alice"), Some(UserId(42)));
        assert_eq!(registry.user_id_by_name("bob"), None);
    }

    #[test]
    fn test_active_names_is_a_sorted_snapshot() {
        let registry = SessionRegistry::new();
        for (i, name) in ["carol", "alice", "bob"].iter().enumerate() {
            let (s, _rx) = session(i as u64);
            registry.subscribe(&s, user(i as u64, name)).unwrap();
        }

        assert_eq!(registry.active_names(), ["alice", "bob", "carol"]);
    }

    // =====================================================================
    // rename()
    // =====================================================================

    #[test]
    fn test_rename_rekeys_and_updates_shared_user() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        let shared = user(1, "alice");
        registry.subscribe(&s, Arc::clone(&shared)).unwrap();

        registry.rename(&s, "alicia").unwrap();

        assert!(registry.is_name_busy("alicia"));
        assert!(!registry.is_name_busy("alice"));
        assert_eq!(shared.read().unwrap().display_name, "alicia");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rename_to_busy_name_is_rejected() {
        let registry = SessionRegistry::new();
        let (a, _rx1) = session(1);
        let (b, _rx2) = session(2);
        registry.subscribe(&a, user(1, "alice")).unwrap();
        registry.subscribe(&b, user(2, "bob")).unwrap();

        let result = registry.rename(&b, "alice");

        assert!(matches!(
            result,
            Err(SessionError::NameAlreadyBusy(name)) if name == "alice"
        ));
        // Nothing changed.
        assert!(registry.is_name_busy("bob"));
        assert_eq!(b.display_name().as_deref(), Some("bob"));
    }

    #[test]
    fn test_rename_to_own_name_succeeds() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session(1);
        registry.subscribe(&s, user(1, "alice")).unwrap();

        registry.rename(&s, "alice").unwrap();
        assert!(registry.is_name_busy("alice"));
        assert_eq!(registry.len(), 1);
    }

    // =====================================================================
    // kick()
    // =====================================================================

    #[test]
    fn test_kick_notifies_and_terminates_the_target() {
        let registry = SessionRegistry::new();
        let (target, mut rx) = session(1);
        registry.subscribe(&target, user(1, "alice")).unwrap();

        registry.kick("alice").unwrap();

        assert!(target.is_terminated());
        assert!(registry.lookup_by_name("alice").is_none());

        let outbound = drain(&mut rx);
        assert_eq!(
            outbound,
            [
                Outbound::Line(KICKED_NOTICE.into()),
                Outbound::Line(tokens::EXIT_OK.into()),
                Outbound::Close,
            ]
        );
    }

    #[test]
    fn test_kick_unknown_name_reports_not_found() {
        // The whole table must be scanned before concluding absence:
        // registered non-matching entries must not produce "not found"
        // early, and must survive the kick untouched.
        let registry = SessionRegistry::new();
        let (bystander, _rx) = session(1);
        registry.subscribe(&bystander, user(1, "bob")).unwrap();

        let result = registry.kick("alice");

        assert!(matches!(
            result,
            Err(SessionError::UserNotFound(name)) if name == "alice"
        ));
        assert!(!bystander.is_terminated());
        assert!(registry.is_name_busy("bob"));
    }
}
