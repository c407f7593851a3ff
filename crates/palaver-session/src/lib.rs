//! Session management for Palaver.
//!
//! This crate handles everything between "a connection was accepted" and
//! "messages can be routed to a named user":
//!
//! 1. **Session state** — one [`Session`] per connection, carrying its
//!    lifecycle state, identity, and activity timestamp ([`Session`]).
//! 2. **The registry** — the authoritative table of who is online, keyed by
//!    display name ([`SessionRegistry`]).
//! 3. **Authentication** — the per-line handshake ([`Authenticator`]), the
//!    pluggable credential backend ([`AuthProvider`]), and the stock
//!    user-store-backed implementation ([`StoreAuthProvider`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Server layer (above)   ← dispatches commands, fans out messages
//!     ↕
//! Session layer (this crate)   ← identity, registration, lifecycle
//!     ↕
//! Transport layer (below)   ← frames on a TCP stream
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod provider;
mod registry;
mod session;

pub use auth::{AuthOutcome, AuthProvider, Authenticator};
pub use error::SessionError;
pub use provider::StoreAuthProvider;
pub use registry::SessionRegistry;
pub use session::{Outbound, Session, SessionState};
