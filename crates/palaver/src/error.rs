//! Unified error type for the Palaver server.

use palaver_protocol::ProtocolError;
use palaver_session::SessionError;
use palaver_store::StoreError;
use palaver_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically. A `ChatError` is always
/// local to one session: it tears that session down and never crosses into
/// another connection's task.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A transport-level error (accept, send, recv, framing).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (command grammar).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (registration, authentication).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A user-store error (persistence).
    #[error(transparent)]
    Store(#[from] StoreError),
}
