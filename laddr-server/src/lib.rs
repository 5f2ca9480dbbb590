//! laddr-server - HTTP surface for the laddr assessment engine
//!
//! This crate owns the axum router, the shared [`AppState`] that wires the
//! core engine components around one store, and the server lifecycle
//! including the background feedback worker.

mod error;
pub mod http;
mod state;

use std::sync::Arc;

use laddr_core::{
    FeedbackQueue, FeedbackWorker, MemoryStore, ScoringPolicy, TemplateFeedbackProvider,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// The main laddr server
pub struct LaddrServer {
    config: ServerConfig,
    state: Arc<AppState>,
    worker: Option<FeedbackWorker>,
    shutdown: CancellationToken,
}

impl LaddrServer {
    /// Create a server backed by a fresh in-memory store and the built-in
    /// template feedback provider
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (queue, rx) = FeedbackQueue::channel();
        let worker = FeedbackWorker::new(rx, Arc::new(TemplateFeedbackProvider), store.clone());
        let state = Arc::new(AppState::new(
            store.clone(),
            store,
            ScoringPolicy::default(),
            queue,
        ));

        Self {
            config,
            state,
            worker: Some(worker),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a server with custom state; no feedback worker is attached
    /// until [`LaddrServer::with_worker`] adds one
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self {
            config,
            state,
            worker: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach the feedback worker that drains the state's queue
    #[must_use]
    pub fn with_worker(mut self, worker: FeedbackWorker) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address.
    ///
    /// The feedback worker, if any, runs as a background task and is
    /// cancelled when serving stops.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("laddr server listening on {}", addr);

        if let Some(worker) = self.worker {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                worker.run(shutdown).await;
            });
        }

        let router = create_router(self.state);
        let result = axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        self.shutdown.cancel();
        result
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7610,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "0.0.0.0:7610")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
