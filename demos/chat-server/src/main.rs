//! Palaver demo server.
//!
//! Binds the chat server on a TCP address and backs it with the in-memory
//! user store. Users are seeded from a `users.json` file in the working
//! directory if one exists; otherwise a default administrator account is
//! created (login `admin`, password `admin123`).
//!
//! Usage: `chat-server [bind-addr]` (default `127.0.0.1:8189`).

use std::sync::Arc;

use palaver::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8189".to_string());

    let store = Arc::new(load_store()?);
    let provider = StoreAuthProvider::new(Arc::clone(&store))?;

    ChatServerBuilder::new()
        .bind(&addr)
        .build(provider, store)
        .await?
        .run()
        .await?;

    Ok(())
}

/// Builds the user store, seeding from `users.json` when present.
fn load_store() -> Result<MemoryUserStore, Box<dyn std::error::Error>> {
    match std::fs::read_to_string("users.json") {
        Ok(raw) => {
            let users: Vec<User> = serde_json::from_str(&raw)?;
            tracing::info!(count = users.len(), "seeded users from users.json");
            Ok(MemoryUserStore::with_users(users))
        }
        Err(_) => {
            tracing::info!("users.json not found, seeding default admin account");
            Ok(MemoryUserStore::with_users(vec![User::new(
                UserId(1),
                "admin",
                "admin123",
                "admin",
                [RoleKind::Admin, RoleKind::User],
            )]))
        }
    }
}
