//! # Palaver
//!
//! A multi-client text chat server over framed TCP.
//!
//! Clients connect, authenticate (`/auth`) or register (`/reg`), and then
//! exchange broadcast messages, whispers (`/w`), and admin commands
//! (`/kick`, `/changeRole`) through a central server. This crate assembles
//! the full server from the layer crates: `palaver-transport` (framed TCP),
//! `palaver-protocol` (command grammar), `palaver-session` (registry,
//! lifecycle, authentication), and `palaver-store` (user persistence seam).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use palaver::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ChatError> {
//!     let store = Arc::new(MemoryUserStore::new());
//!     let provider = StoreAuthProvider::new(Arc::clone(&store))?;
//!     ChatServerBuilder::new()
//!         .bind("0.0.0.0:8189")
//!         .build(provider, store)
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod dispatcher;
mod error;
mod handler;
mod message;
mod reaper;
mod server;

pub use error::ChatError;
pub use message::MessageService;
pub use reaper::{IdleReaper, ReaperConfig};
pub use server::{ChatServer, ChatServerBuilder};

/// One-stop imports for embedding or extending the server.
pub mod prelude {
    pub use crate::{
        ChatError, ChatServer, ChatServerBuilder, IdleReaper, MessageService,
        ReaperConfig,
    };
    pub use palaver_protocol::tokens;
    pub use palaver_session::{
        AuthOutcome, AuthProvider, Authenticator, Session, SessionError,
        SessionRegistry, SessionState, StoreAuthProvider,
    };
    pub use palaver_store::{
        MemoryUserStore, RoleKind, SharedUser, StoreError, User, UserId,
        UserStore,
    };
}
