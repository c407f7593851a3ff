//! Session types: the server-side record of one client connection.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use palaver_store::SharedUser;
use palaver_transport::ConnectionId;
use tokio::sync::futures::Notified;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

use crate::SessionRegistry;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// An item on a session's outbound queue, drained by its writer task.
#[derive(Debug, PartialEq, Eq)]
pub enum Outbound {
    /// One frame to deliver to the client.
    Line(String),

    /// Flush and close the connection; nothing is delivered afterwards.
    Close,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a session.
///
/// ```text
///   Connecting → Authenticating → Authenticated → Terminated
///                       │                             ↑
///                       └──────── (/exit, EOF) ───────┘
/// ```
///
/// `Connecting` exists only between accept and the first prompt;
/// `Authenticating` loops until a login or registration succeeds. Every
/// state can reach `Terminated`, and the transition is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The connection was accepted but nothing has happened yet.
    Connecting,

    /// The handshake loop owns every inbound line.
    Authenticating,

    /// Identity is set and the session is in the registry.
    Authenticated,

    /// The session is dead; the registry entry is gone and the writer
    /// task has been told to close the transport.
    Terminated,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Server-side state for one client connection.
///
/// The reader side is exclusively owned by the connection's handler task;
/// [`send`](Session::send) may be called concurrently from anywhere
/// (broadcast, kick, reaper) — it only enqueues on the outbound channel
/// whose receiving end is drained by the connection's writer task.
pub struct Session {
    id: ConnectionId,
    outbound: UnboundedSender<Outbound>,
    identity: OnceLock<SharedUser>,
    state: Mutex<SessionState>,
    last_active: Mutex<Instant>,
    shutdown: Notify,
}

impl Session {
    /// Creates a session for a freshly accepted connection.
    ///
    /// Returns the session handle and the receiving end of its outbound
    /// queue; the caller spawns a writer task that drains the receiver
    /// into the transport.
    pub fn new(id: ConnectionId) -> (Arc<Self>, UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            id,
            outbound: tx,
            identity: OnceLock::new(),
            state: Mutex::new(SessionState::Connecting),
            last_active: Mutex::new(Instant::now()),
            shutdown: Notify::new(),
        });
        (session, rx)
    }

    /// The underlying connection's identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Moves a fresh session into the handshake phase.
    pub fn begin_authenticating(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Connecting {
            *state = SessionState::Authenticating;
        }
    }

    /// Marks the session authenticated. Called by the registry inside its
    /// subscribe critical section.
    pub(crate) fn mark_authenticated(&self) {
        *self.state.lock().unwrap() = SessionState::Authenticated;
    }

    /// Stores the session's identity. Called by the registry inside its
    /// subscribe critical section; set at most once for the session's life.
    pub(crate) fn set_identity(&self, user: SharedUser) {
        let already_set = self.identity.set(user).is_err();
        debug_assert!(!already_set, "identity must be set exactly once");
    }

    /// The authenticated user, if the handshake has completed.
    pub fn identity(&self) -> Option<&SharedUser> {
        self.identity.get()
    }

    /// The authenticated user's current display name.
    pub fn display_name(&self) -> Option<String> {
        self.identity
            .get()
            .map(|user| user.read().unwrap().display_name.clone())
    }

    /// Whether the authenticated user holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.identity
            .get()
            .is_some_and(|user| user.read().unwrap().is_admin())
    }

    /// Enqueues one frame for delivery. Never blocks; silently drops the
    /// frame if the writer task is already gone.
    pub fn send(&self, line: impl Into<String>) {
        let _ = self.outbound.send(Outbound::Line(line.into()));
    }

    /// Records activity now. `Instant` is monotonic, so the timestamp
    /// never moves backwards.
    pub fn touch(&self) {
        *self.last_active.lock().unwrap() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().unwrap().elapsed()
    }

    /// Whether the session has been terminated.
    pub fn is_terminated(&self) -> bool {
        self.state() == SessionState::Terminated
    }

    /// A future that resolves once the session is terminated.
    ///
    /// The returned future receives wakeups from the moment it is created,
    /// so callers must create it *before* checking [`is_terminated`]
    /// (create, check, then await — no missed-notification window).
    ///
    /// [`is_terminated`]: Session::is_terminated
    pub fn terminated(&self) -> Notified<'_> {
        self.shutdown.notified()
    }

    /// Terminates the session: unregisters it, tells the writer task to
    /// close the transport, and wakes the reader out of its blocked read.
    ///
    /// Idempotent and race-safe: terminations can arrive simultaneously
    /// from the client's `/exit`, an administrative kick, the idle reaper,
    /// and a transport error — only the first caller acts, and it returns
    /// `true`.
    pub fn terminate(&self, registry: &SessionRegistry) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if *state == SessionState::Terminated {
                return false;
            }
            *state = SessionState::Terminated;
        }

        registry.unsubscribe(self);
        let _ = self.outbound.send(Outbound::Close);
        self.shutdown.notify_waiters();

        tracing::info!(id = %self.id, name = ?self.display_name(), "session terminated");
        true
    }
}
