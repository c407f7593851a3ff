//! Per-connection handler: handshake loop, command loop, teardown.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a small writer task that drains the session's outbound queue into
//! the socket. The flow is:
//!   1. Create the session (Connecting → Authenticating)
//!   2. Loop: prompt → read line → authenticator, until logged in
//!   3. Loop: read line → dispatcher, until exit/EOF/termination
//!   4. Terminate (idempotent — kick and reaper may have beaten us to it)

use std::sync::Arc;

use palaver_protocol::tokens;
use palaver_session::{
    AuthOutcome, AuthProvider, Authenticator, Outbound, Session,
};
use palaver_store::UserStore;
use palaver_transport::{Connection, TcpConnection};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::dispatcher::{Dispatcher, Flow};
use crate::server::ServerState;
use crate::ChatError;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<P, S>(
    conn: TcpConnection,
    state: Arc<ServerState<P, S>>,
) -> Result<(), ChatError>
where
    P: AuthProvider,
    S: UserStore,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "client connected");

    let (session, outbound_rx) = Session::new(conn_id);
    session.begin_authenticating();

    let writer =
        tokio::spawn(write_outbound(Arc::clone(&conn), outbound_rx));

    let result = drive(&conn, &session, &state).await;

    // Whatever ended the loop — EOF, transport error, /exit, a kick or the
    // reaper winning a race — the registry entry must be gone and the
    // writer told to close the transport. Terminate is idempotent.
    session.terminate(&state.registry);
    let _ = writer.await;

    tracing::debug!(%conn_id, "client disconnected");
    result
}

/// Drains a session's outbound queue into the socket until told to close.
async fn write_outbound(
    conn: Arc<TcpConnection>,
    mut rx: UnboundedReceiver<Outbound>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Line(line) => {
                if let Err(e) = conn.send(&line).await {
                    tracing::debug!(id = %conn.id(), error = %e, "send failed");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = conn.close().await;
}

/// Runs the handshake loop and then the command loop.
async fn drive<P, S>(
    conn: &TcpConnection,
    session: &Arc<Session>,
    state: &ServerState<P, S>,
) -> Result<(), ChatError>
where
    P: AuthProvider,
    S: UserStore,
{
    // --- Handshake ---
    let authenticator =
        Authenticator::new(&state.registry, &state.provider);
    loop {
        session.send(tokens::AUTH_PROMPT);
        let Some(line) = read_line(conn, session).await? else {
            return Ok(());
        };
        match authenticator.handle_line(session, &line).await {
            AuthOutcome::LoggedIn => break,
            AuthOutcome::Retry => continue,
            AuthOutcome::Exit => return Ok(()),
        }
    }

    tracing::info!(
        id = %session.id(),
        name = ?session.display_name(),
        "client authenticated"
    );
    session.send(tokens::HELP_HINT);

    // --- Command loop ---
    let dispatcher = Dispatcher::new(session, state);
    loop {
        let Some(line) = read_line(conn, session).await? else {
            return Ok(());
        };
        if dispatcher.dispatch(&line) == Flow::Stop {
            return Ok(());
        }
    }
}

/// Reads the next inbound frame, or returns `None` once the session is
/// terminated or the peer closes.
///
/// The shutdown future is created before the state check: it receives
/// wakeups from creation time, so a terminate landing between the check
/// and the select cannot be missed.
async fn read_line(
    conn: &TcpConnection,
    session: &Session,
) -> Result<Option<String>, ChatError> {
    let terminated = session.terminated();
    tokio::pin!(terminated);

    if session.is_terminated() {
        return Ok(None);
    }

    tokio::select! {
        res = conn.recv() => Ok(res?),
        _ = &mut terminated => Ok(None),
    }
}
