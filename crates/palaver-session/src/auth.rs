//! The handshake: per-line authentication logic and the provider seam.
//!
//! The server doesn't decide what a valid credential is — that's the
//! [`AuthProvider`]'s job ([`StoreAuthProvider`](crate::StoreAuthProvider)
//! in the stock setup, anything implementing the trait otherwise). The
//! [`Authenticator`] owns the protocol side: recognizing `/auth`, `/reg`
//! and `/exit`, mapping provider verdicts to client messages, and attaching
//! the winning identity to the session via the registry.

use std::sync::Arc;

use palaver_protocol::{tokens, AuthRequest, ProtocolError};
use palaver_store::{RoleKind, SharedUser};

use crate::{Session, SessionError, SessionRegistry};

/// Validates credentials and registers new users.
///
/// Implementations are shared across every connection task (`Send + Sync`)
/// and typically wrap a user store, an external identity service, or a
/// test fixture.
pub trait AuthProvider: Send + Sync + 'static {
    /// Called once at server startup, before any connection is accepted.
    fn initialize(&self) {}

    /// Resolves a login/password pair to a user.
    ///
    /// # Errors
    /// [`SessionError::InvalidCredentials`] when no user matches.
    fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<SharedUser, SessionError>> + Send;

    /// Creates a new user with the given role.
    ///
    /// # Errors
    /// [`SessionError::ValidationFailed`], [`SessionError::LoginTaken`],
    /// [`SessionError::NameTaken`], or a store failure.
    fn register(
        &self,
        login: &str,
        password: &str,
        name: &str,
        role: RoleKind,
    ) -> impl std::future::Future<Output = Result<SharedUser, SessionError>> + Send;
}

/// What the handshake loop should do after processing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session is authenticated and registered; switch to the
    /// command loop.
    LoggedIn,

    /// Authentication did not complete; re-prompt and read the next line.
    Retry,

    /// The client asked to leave before logging in; terminate without
    /// ever registering.
    Exit,
}

/// Stateless per-session handshake logic.
pub struct Authenticator<'a, P: AuthProvider> {
    registry: &'a SessionRegistry,
    provider: &'a P,
}

impl<'a, P: AuthProvider> Authenticator<'a, P> {
    /// Creates a handshake processor over the given registry and provider.
    pub fn new(registry: &'a SessionRegistry, provider: &'a P) -> Self {
        Self { registry, provider }
    }

    /// Processes one line from a session in the `Authenticating` state.
    pub async fn handle_line(
        &self,
        session: &Arc<Session>,
        line: &str,
    ) -> AuthOutcome {
        match AuthRequest::parse(line) {
            Err(ProtocolError::BadArity { command }) => {
                session.send(format!("Invalid command format {command}"));
                AuthOutcome::Retry
            }
            Ok(AuthRequest::Exit) => {
                session.send(tokens::EXIT_OK);
                AuthOutcome::Exit
            }
            Ok(AuthRequest::Login { login, password }) => {
                self.login(session, login, password).await
            }
            Ok(AuthRequest::Register {
                login,
                password,
                name,
            }) => self.register(session, login, password, name).await,
            Ok(AuthRequest::Other) => AuthOutcome::Retry,
        }
    }

    async fn login(
        &self,
        session: &Arc<Session>,
        login: &str,
        password: &str,
    ) -> AuthOutcome {
        match self.provider.authenticate(login, password).await {
            Ok(user) => self.attach(session, user, tokens::auth_ok),
            Err(SessionError::InvalidCredentials) => {
                session.send("Invalid login/password");
                AuthOutcome::Retry
            }
            Err(e) => {
                tracing::warn!(login, error = %e, "authentication failed");
                session.send("Authentication failed, try again later");
                AuthOutcome::Retry
            }
        }
    }

    async fn register(
        &self,
        session: &Arc<Session>,
        login: &str,
        password: &str,
        name: &str,
    ) -> AuthOutcome {
        let result = self
            .provider
            .register(login, password, name, RoleKind::User)
            .await;

        match result {
            Ok(user) => self.attach(session, user, tokens::reg_ok),
            Err(SessionError::ValidationFailed) => {
                session.send(
                    "Requirements not met: login 3+ characters, \
                     password 6+ characters, name 2+ characters",
                );
                AuthOutcome::Retry
            }
            Err(SessionError::LoginTaken(_)) => {
                session.send("The specified login is already taken");
                AuthOutcome::Retry
            }
            Err(SessionError::NameTaken(_)) => {
                session.send("The specified name is already taken");
                AuthOutcome::Retry
            }
            Err(e) => {
                tracing::warn!(login, error = %e, "registration failed");
                session.send("Registration failed, try again later");
                AuthOutcome::Retry
            }
        }
    }

    /// Registers the resolved user on this session and acknowledges.
    ///
    /// The registry enforces name uniqueness atomically; an already-active
    /// account is an ordinary retry, never a crash.
    fn attach(
        &self,
        session: &Arc<Session>,
        user: SharedUser,
        ack: fn(&str) -> String,
    ) -> AuthOutcome {
        let name = user.read().unwrap().display_name.clone();
        match self.registry.subscribe(session, user) {
            Ok(()) => {
                session.send(ack(&name));
                AuthOutcome::LoggedIn
            }
            Err(SessionError::NameAlreadyBusy(_)) => {
                session.send("The account is already in use");
                AuthOutcome::Retry
            }
            Err(e) => {
                tracing::warn!(%name, error = %e, "subscribe failed");
                session.send("Authentication failed, try again later");
                AuthOutcome::Retry
            }
        }
    }
}
