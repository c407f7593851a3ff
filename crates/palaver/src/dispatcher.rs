//! Post-authentication command dispatch.
//!
//! One call per inbound line from an authenticated session. A line that
//! does not start with `/` is a plain chat message and is broadcast;
//! everything else is dispatched by its leading token. Every client-visible
//! failure (format, permission, not-found, persistence) is reported to the
//! offending session only — the session itself stays up.

use std::sync::Arc;

use palaver_protocol::{tokens, Command, ProtocolError};
use palaver_session::{AuthProvider, Session, SessionError};
use palaver_store::{RoleKind, UserStore};

use crate::server::ServerState;

/// What the command loop should do after a dispatched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Keep reading lines.
    Continue,

    /// The session asked to leave; stop the loop.
    Stop,
}

/// Dispatches one session's command lines against the shared server state.
pub(crate) struct Dispatcher<'a, P: AuthProvider, S: UserStore> {
    session: &'a Arc<Session>,
    state: &'a ServerState<P, S>,
}

impl<'a, P: AuthProvider, S: UserStore> Dispatcher<'a, P, S> {
    pub(crate) fn new(
        session: &'a Arc<Session>,
        state: &'a ServerState<P, S>,
    ) -> Self {
        Self { session, state }
    }

    /// Processes one inbound line. Always touches the activity timestamp
    /// first — any traffic counts against the idle timeout.
    pub(crate) fn dispatch(&self, line: &str) -> Flow {
        self.session.touch();

        if !line.starts_with('/') {
            let name = self.session.display_name().unwrap_or_default();
            self.state.messages.broadcast(&format!("{name} : {line}"));
            return Flow::Continue;
        }

        match Command::parse(line) {
            Err(ProtocolError::BadArity { command }) => {
                self.session.send(format!("Invalid command format {command}"));
                Flow::Continue
            }
            Ok(Command::ChangeName { name }) => self.change_name(name),
            Ok(Command::GetName) => self.get_name(),
            Ok(Command::ChangeRole { target, role }) => {
                self.change_role(target, role)
            }
            Ok(Command::GetRole) => self.get_role(),
            Ok(Command::GetActiveClients) => {
                self.state.messages.broadcast_active_clients();
                Flow::Continue
            }
            Ok(Command::Whisper { to, text }) => self.whisper(to, &text),
            Ok(Command::Kick { name }) => self.kick(name),
            Ok(Command::Help) => {
                self.session.send(tokens::HELP_TEXT);
                Flow::Continue
            }
            Ok(Command::Exit) => {
                self.session.send(tokens::EXIT_OK);
                self.session.terminate(&self.state.registry);
                Flow::Stop
            }
            Ok(Command::Unknown { token }) => {
                tracing::debug!(
                    id = %self.session.id(),
                    token,
                    "ignoring unknown command"
                );
                Flow::Continue
            }
        }
    }

    fn change_name(&self, new_name: &str) -> Flow {
        let Some(user) = self.session.identity() else {
            return Flow::Continue;
        };
        let user_id = user.read().unwrap().id;

        // Pre-check so the common collision never hits the store; the
        // registry re-key below re-checks atomically.
        if self
            .state
            .registry
            .lookup_by_name(new_name)
            .is_some_and(|other| other.id() != self.session.id())
        {
            self.session
                .send(format!("The name {new_name} is already in use"));
            return Flow::Continue;
        }

        // Persist first; the in-memory rename only happens after the
        // store accepted it.
        if let Err(e) = self.state.store.rename(user_id, new_name) {
            tracing::warn!(%user_id, error = %e, "rename persistence failed");
            self.session.send("Failed to change name, try again later");
            return Flow::Continue;
        }

        match self.state.registry.rename(self.session, new_name) {
            Ok(()) => {
                self.session.send(format!("Your new nickname: {new_name}"));
            }
            Err(SessionError::NameAlreadyBusy(_)) => {
                self.session
                    .send(format!("The name {new_name} is already in use"));
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "rename failed");
                self.session.send("Failed to change name, try again later");
            }
        }
        Flow::Continue
    }

    fn get_name(&self) -> Flow {
        let name = self.session.display_name().unwrap_or_default();
        self.session.send(format!("Your nickname: {name}"));
        Flow::Continue
    }

    fn change_role(&self, target: &str, role_token: &str) -> Flow {
        if !self.session.is_admin() {
            self.session.send(
                "You are not an administrator and cannot change user roles.",
            );
            return Flow::Continue;
        }

        let Some(target_session) = self.state.registry.lookup_by_name(target)
        else {
            self.session.send(format!(
                "User with nickname {target} not registered in chat"
            ));
            return Flow::Continue;
        };

        let role: RoleKind = match role_token.parse() {
            Ok(role) => role,
            Err(unknown) => {
                self.session.send(unknown.to_string());
                return Flow::Continue;
            }
        };

        let Some(target_user) = target_session.identity() else {
            return Flow::Continue;
        };
        let target_id = target_user.read().unwrap().id;

        // ADMIN grants the admin role, USER revokes it; membership in the
        // role set makes both directions idempotent.
        let persisted = match role {
            RoleKind::Admin => {
                self.state.store.add_role(target_id, RoleKind::Admin)
            }
            RoleKind::User => {
                self.state.store.remove_role(target_id, RoleKind::Admin)
            }
        };
        if let Err(e) = persisted {
            tracing::warn!(%target_id, error = %e, "role persistence failed");
            self.session.send("Failed to change role, try again later");
            return Flow::Continue;
        }

        {
            let mut target_user = target_user.write().unwrap();
            match role {
                RoleKind::Admin => {
                    target_user.roles.insert(RoleKind::Admin);
                }
                RoleKind::User => {
                    target_user.roles.remove(&RoleKind::Admin);
                }
            }
        }

        self.session.send(format!(
            "User {target} now has roles: {}",
            target_user.read().unwrap().roles_line()
        ));
        Flow::Continue
    }

    fn get_role(&self) -> Flow {
        let roles = self
            .session
            .identity()
            .map(|user| user.read().unwrap().roles_line())
            .unwrap_or_default();
        self.session.send(format!("Your role/roles: {roles}"));
        Flow::Continue
    }

    fn whisper(&self, to: &str, text: &str) -> Flow {
        let from = self.session.display_name().unwrap_or_default();
        self.state
            .messages
            .direct_message(&format!("{from} : {text}"), to, &from);
        Flow::Continue
    }

    fn kick(&self, name: &str) -> Flow {
        if !self.session.is_admin() {
            self.session.send(
                "You are not an administrator and cannot remove users from the chat.",
            );
            return Flow::Continue;
        }

        match self.state.registry.kick(name) {
            Ok(()) => {
                self.session.send(format!(
                    "Client with nickname {name} disconnected from chat"
                ));
            }
            Err(SessionError::UserNotFound(_)) => {
                self.session.send(format!(
                    "User with nickname {name} not registered in chat"
                ));
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "kick failed");
            }
        }
        Flow::Continue
    }
}
