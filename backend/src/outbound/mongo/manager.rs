//! Lifecycle manager for the document-store connection.
//!
//! The connection is established lazily on first use, touched on every
//! acquisition, and torn down by an explicit idle reaper after a configured
//! inactivity window. Connect and disconnect are idempotent no-ops when the
//! manager is already in the target state, so adapters can simply acquire a
//! handle per operation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bson::doc;
use mongodb::{Client, Database};
use tokio::sync::Mutex;
use tracing::info;

/// Errors raised while establishing the store connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MongoManagerError {
    /// The client could not be built or the server did not answer the ping.
    #[error("failed to connect to document store: {message}")]
    Connect { message: String },
}

impl MongoManagerError {
    fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }
}

/// Configuration for the store connection manager.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    uri: String,
    database: String,
    idle_timeout: Duration,
}

impl MongoConfig {
    /// Create a configuration with the given connection URI.
    ///
    /// Defaults: database `portfolio`, idle timeout 5 minutes.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: "portfolio".to_owned(),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the inactivity window after which the reaper disconnects.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// The configured database name.
    pub fn database(&self) -> &str {
        &self.database
    }
}

#[derive(Default)]
struct ManagerState {
    client: Option<Client>,
    last_used: Option<Instant>,
}

/// Shared connection manager handed to every store adapter.
pub struct MongoManager {
    config: MongoConfig,
    state: Mutex<ManagerState>,
}

impl MongoManager {
    /// Create a manager; no connection is attempted until first use.
    pub fn new(config: MongoConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(ManagerState::default()),
        })
    }

    /// Acquire a database handle, connecting lazily and refreshing the
    /// idle clock.
    pub async fn database(&self) -> Result<Database, MongoManagerError> {
        let mut state = self.state.lock().await;

        let client = if let Some(client) = &state.client {
            client.clone()
        } else {
            let client = Client::with_uri_str(&self.config.uri)
                .await
                .map_err(|err| MongoManagerError::connect(err.to_string()))?;
            client
                .database(&self.config.database)
                .run_command(doc! { "ping": 1 }, None)
                .await
                .map_err(|err| MongoManagerError::connect(err.to_string()))?;
            info!(database = %self.config.database, "connected to document store");
            state.client = Some(client.clone());
            client
        };

        state.last_used = Some(Instant::now());
        Ok(client.database(&self.config.database))
    }

    /// Tear down the connection; a no-op when already disconnected.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let Some(client) = state.client.take() {
            client.shutdown().await;
            info!("disconnected from document store");
        }
        state.last_used = None;
    }

    /// Run the idle reaper until the manager is dropped: disconnect after
    /// the configured inactivity window; the next acquisition reconnects.
    pub async fn run_idle_reaper(self: Arc<Self>) {
        let idle_timeout = self.config.idle_timeout;
        let check_every = (idle_timeout / 4).max(Duration::from_secs(1));
        loop {
            tokio::time::sleep(check_every).await;
            let idle_expired = {
                let state = self.state.lock().await;
                state.client.is_some()
                    && state
                        .last_used
                        .is_some_and(|last| last.elapsed() >= idle_timeout)
            };
            if idle_expired {
                info!("document store idle window elapsed");
                self.disconnect().await;
            }
        }
    }
}
