//! Runtime assembly: adapters, services, worker, and handler state.

pub mod config;

use std::sync::Arc;

use reqwest::Url;
use tracing::warn;

use crate::domain::ports::{
    ProfileFetcher, ProjectCommand, ProjectQuery, TokenVerifier, UserLifecycle,
};
use crate::domain::{
    PrincipalResolver, ProjectService, ReferenceSyncConfig, ReferenceSyncWorker, UserService,
};
use crate::inbound::http::AppState;
use crate::outbound::identity::{HttpProfileFetcher, HttpTokenVerifier};
use crate::outbound::mongo::{MongoConfig, MongoManager, MongoProjectStore, MongoUserStore};
use crate::outbound::queue::sync_channel;
use crate::outbound::search::GithubIdentitySearch;

pub use config::AppSettings;

/// Errors raised while assembling the runtime.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// A required configuration value is absent.
    #[error("missing required configuration: {name}")]
    MissingConfig { name: &'static str },
    /// A configured URL failed to parse.
    #[error("invalid configuration {name}: {message}")]
    InvalidConfig { name: &'static str, message: String },
    /// An outbound HTTP client could not be constructed.
    #[error("failed to build outbound client: {message}")]
    HttpClient { message: String },
}

impl BootstrapError {
    fn missing(name: &'static str) -> Self {
        Self::MissingConfig { name }
    }

    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            name,
            message: message.into(),
        }
    }
}

/// Assembled runtime: handler state plus the background-task anchors.
pub struct Runtime {
    pub state: AppState,
    pub bind_addr: String,
    pub store_manager: Arc<MongoManager>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, BootstrapError> {
    Url::parse(raw).map_err(|err| BootstrapError::invalid(name, err.to_string()))
}

/// Wire adapters to services, spawn the sync worker and the idle reaper,
/// and return the handler state.
pub async fn build(settings: &AppSettings) -> Result<Runtime, BootstrapError> {
    let mongo_uri = settings
        .mongo_uri
        .as_deref()
        .ok_or_else(|| BootstrapError::missing("PORTFOLIO_MONGO_URI"))?;

    let manager = MongoManager::new(
        MongoConfig::new(mongo_uri)
            .with_database(settings.mongo_database())
            .with_idle_timeout(settings.store_idle_timeout()),
    );
    let project_store = Arc::new(MongoProjectStore::new(Arc::clone(&manager)));
    let user_store = Arc::new(MongoUserStore::new(Arc::clone(&manager)));

    // Index bootstrap is best effort: a store that is down at startup will
    // connect lazily on first use instead.
    if let Err(error) = project_store.ensure_indexes().await {
        warn!(%error, "project index bootstrap failed");
    }
    if let Err(error) = user_store.ensure_indexes().await {
        warn!(%error, "user index bootstrap failed");
    }

    let timeout = settings.outbound_timeout();
    let search_url = parse_url("PORTFOLIO_IDENTITY_SEARCH_URL", settings.identity_search_url())?;
    let search = Arc::new(
        GithubIdentitySearch::new(search_url, settings.identity_search_token.clone(), timeout)
            .map_err(|err| BootstrapError::HttpClient {
                message: err.to_string(),
            })?,
    );

    let (queue, receiver) = sync_channel();
    let queue = Arc::new(queue);
    let worker = Arc::new(ReferenceSyncWorker::new(
        Arc::clone(&project_store),
        Arc::clone(&user_store),
        search,
        ReferenceSyncConfig {
            enrichment_max_attempts: settings.enrichment_max_attempts(),
            enrichment_backoff: settings.enrichment_backoff(),
        },
    ));
    tokio::spawn(worker.run(receiver));
    tokio::spawn(Arc::clone(&manager).run_idle_reaper());

    let verify_url = settings
        .token_verify_url
        .as_deref()
        .ok_or_else(|| BootstrapError::missing("PORTFOLIO_TOKEN_VERIFY_URL"))?;
    let audience = settings
        .token_audience
        .as_deref()
        .ok_or_else(|| BootstrapError::missing("PORTFOLIO_TOKEN_AUDIENCE"))?;
    let verifier: Arc<dyn TokenVerifier> = Arc::new(
        HttpTokenVerifier::new(
            parse_url("PORTFOLIO_TOKEN_VERIFY_URL", verify_url)?,
            audience,
            timeout,
        )
        .map_err(|err| BootstrapError::HttpClient {
            message: err.to_string(),
        })?,
    );
    let profiles: Arc<dyn ProfileFetcher> =
        Arc::new(HttpProfileFetcher::new(timeout).map_err(|err| BootstrapError::HttpClient {
            message: err.to_string(),
        })?);

    let roster = settings.admin_roster();
    let resolver = Arc::new(PrincipalResolver::new(verifier, profiles, roster.clone()));

    let projects = Arc::new(ProjectService::new(project_store, Arc::clone(&queue)));
    let users = Arc::new(UserService::new(user_store, queue, roster));
    let commands: Arc<dyn ProjectCommand> = projects.clone();
    let queries: Arc<dyn ProjectQuery> = projects;
    let lifecycle: Arc<dyn UserLifecycle> = users;

    Ok(Runtime {
        state: AppState::new(commands, queries, lifecycle, resolver),
        bind_addr: settings.bind_addr().to_owned(),
        store_manager: manager,
    })
}
