//! Application-level protocol for Palaver.
//!
//! Everything a client sends is one text line per frame. Lines beginning
//! with `/` are commands; anything else is a plain chat message. This crate
//! owns the command grammar — which tokens exist, how many arguments each
//! takes — and the control tokens the server emits (`/exitok`,
//! `/authok <name>`, `/regok <name>`).
//!
//! The grammar is split in two because the server speaks two dialects over
//! a connection's lifetime:
//! - [`AuthRequest`] — the handshake dialect, before a session has an
//!   identity (`/auth`, `/reg`, `/exit`).
//! - [`Command`] — the authenticated dialect (`/w`, `/kick`, …).

mod command;
mod error;
pub mod tokens;

pub use command::{AuthRequest, Command};
pub use error::ProtocolError;
