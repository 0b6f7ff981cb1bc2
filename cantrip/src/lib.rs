//! cantrip - tabletop RPG companion server
//!
//! Dice rolling, character sheets, and the attack creation and
//! resolution flows behind the chat commands.

pub mod api;
pub mod attack;
pub mod character;
pub mod config;
pub mod db;
pub mod dice;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub use config::Config;
use db::Database;
use session::InteractionManager;

/// The cantrip server instance
pub struct Server {
    state: api::AppState,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.db_path.as_deref()).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            state: api::AppState::new(Arc::new(db), config),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.state.db.clone()
    }

    /// Get the interaction manager
    pub fn sessions(&self) -> Arc<InteractionManager> {
        self.state.sessions.clone()
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        let local_addr = listener.local_addr()?;
        info!("cantrip listening on {}", local_addr);

        let sweeper = self.spawn_sweeper();
        let router = api::router(self.state.clone());
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        sweeper.abort();
        info!("cantrip shutdown complete");
        Ok(())
    }

    /// Periodically drop interactions nobody finished
    fn spawn_sweeper(&self) -> JoinHandle<()> {
        let sessions = self.state.sessions.clone();
        let ttl = self.state.config.interaction_timeout();
        let mut interval = tokio::time::interval(self.state.config.sweep_interval());
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        sessions.sweep_expired(ttl).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        })
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }
}
