//! `ChatServer` builder and accept loop.
//!
//! This is the entry point for running a Palaver server. It ties together
//! all the layers: transport → session → dispatch, plus the idle reaper.

use std::sync::Arc;

use palaver_session::{AuthProvider, SessionRegistry};
use palaver_store::UserStore;
use palaver_transport::{TcpTransport, Transport};

use crate::handler::handle_connection;
use crate::{ChatError, IdleReaper, MessageService, ReaperConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// carries its own interior lock; the provider and store are shared
/// read-mostly.
pub(crate) struct ServerState<P: AuthProvider, S: UserStore> {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) messages: MessageService,
    pub(crate) provider: P,
    pub(crate) store: Arc<S>,
}

/// Builder for configuring and starting a Palaver server.
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MemoryUserStore::new());
/// let provider = StoreAuthProvider::new(Arc::clone(&store))?;
/// let server = ChatServer::builder()
///     .bind("0.0.0.0:8189")
///     .build(provider, store)
///     .await?;
/// server.run().await
/// ```
pub struct ChatServerBuilder {
    bind_addr: String,
    reaper_config: ReaperConfig,
}

impl ChatServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8189".to_string(),
            reaper_config: ReaperConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the idle reaper configuration.
    pub fn reaper_config(mut self, config: ReaperConfig) -> Self {
        self.reaper_config = config;
        self
    }

    /// Binds the transport and assembles the server.
    ///
    /// The provider's `initialize` hook runs here, before any connection
    /// is accepted.
    pub async fn build<P: AuthProvider, S: UserStore>(
        self,
        provider: P,
        store: Arc<S>,
    ) -> Result<ChatServer<P, S>, ChatError> {
        let transport = TcpTransport::bind(&self.bind_addr).await?;

        provider.initialize();

        let registry = Arc::new(SessionRegistry::new());
        let state = Arc::new(ServerState {
            messages: MessageService::new(Arc::clone(&registry)),
            registry,
            provider,
            store,
        });

        Ok(ChatServer {
            transport,
            state,
            reaper_config: self.reaper_config,
        })
    }
}

impl Default for ChatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Palaver chat server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ChatServer<P: AuthProvider, S: UserStore> {
    transport: TcpTransport,
    state: Arc<ServerState<P, S>>,
    reaper_config: ReaperConfig,
}

impl<P: AuthProvider, S: UserStore> ChatServer<P, S> {
    /// Creates a new builder.
    pub fn builder() -> ChatServerBuilder {
        ChatServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server: spawns the idle reaper, then accepts connections
    /// until the process is terminated. Each connection gets its own
    /// handler task; a failing handler never takes the server down.
    pub async fn run(mut self) -> Result<(), ChatError> {
        tracing::info!("Palaver server running");

        let reaper = IdleReaper::new(
            Arc::clone(&self.state.registry),
            self.reaper_config.clone(),
        );
        tokio::spawn(reaper.run());

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
