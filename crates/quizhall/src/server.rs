//! `QuizServer` builder and accept loop.
//!
//! This is the entry point for running a quiz server. It ties together
//! all the layers: transport → protocol → lobby registry.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quizhall_lobby::{
    Catalog, JsonFileSink, LobbyConfig, ResultSink, SessionRegistry,
};
use quizhall_protocol::{Codec, JsonCodec};
use quizhall_session::Sha256Hasher;
use quizhall_transport::{Transport, WebSocketTransport};
use tokio_util::sync::CancellationToken;

use crate::handler::handle_connection;
use crate::{QuizhallError, ServerConfig};

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: SessionRegistry,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a quiz server.
///
/// # Example
///
/// ```rust,ignore
/// let server = QuizServer::builder()
///     .bind("0.0.0.0:8080")
///     .catalog(Catalog::load("problems.json").await?)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct QuizServerBuilder {
    config: ServerConfig,
    catalog: Catalog,
    sink: Option<Arc<dyn ResultSink>>,
}

impl QuizServerBuilder {
    /// Creates a new builder with default settings and an empty catalog.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: Catalog::default(),
            sink: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long an un-joined socket may stay silent.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the directory results are written to.
    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.results_dir = dir.into();
        self
    }

    /// Sets the per-lobby configuration.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Sets the problem catalog shared by every lobby.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Stores results somewhere other than JSON files in `results_dir`.
    pub fn result_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<QuizServer, QuizhallError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_max_message_size(self.config.lobby.owner_max_frame);

        let sink = match self.sink {
            Some(sink) => sink,
            None => Arc::new(JsonFileSink::new(self.config.results_dir.clone())),
        };
        let registry = SessionRegistry::new(
            self.config.lobby.clone(),
            Arc::new(self.catalog),
            sink,
            Arc::new(Sha256Hasher),
        );
        let shutdown = registry.shutdown_token();

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(QuizServer {
            transport,
            state,
            shutdown,
        })
    }
}

impl Default for QuizServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A quiz server bound to its listening socket.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<JsonCodec>>,
    shutdown: CancellationToken,
}

impl QuizServer {
    /// Creates a new builder.
    pub fn builder() -> QuizServerBuilder {
        QuizServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, QuizhallError> {
        Ok(self.transport.local_addr()?)
    }

    /// Cancelling this token stops the accept loop, every lobby, and
    /// every member connection.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The registry behind this server.
    pub fn registry(&self) -> &SessionRegistry {
        &self.state.registry
    }

    /// Runs the accept loop until the shutdown token is cancelled.
    ///
    /// Each accepted socket gets its own task, which runs the pre-join
    /// control exchange and then, once joined, the member loops.
    pub async fn run(mut self) -> Result<(), QuizhallError> {
        tracing::info!(addr = %self.local_addr()?, "quiz server running");

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => None,
                accepted = self.transport.accept() => Some(accepted),
            };

            match accepted {
                Some(Ok(conn)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "accept failed");
                }
                None => break,
            }
        }

        self.state.registry.shutdown().await;
        tracing::info!("quiz server stopped");
        Ok(())
    }
}
