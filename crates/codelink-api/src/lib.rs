use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use codelink_config::{CodelinkConfig, DelayConfig};
use codelink_core::{Document, ProjectName, ProjectNameError, SharedLog, TracingLog};
use codelink_git::{CloneService, GitCli};
use codelink_store::{DocumentStore, FsDocumentStore};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod documents;
pub mod error;
pub mod extract;
mod health;
mod projects;

pub use error::{ApiError, ErrorBody};

pub const SERVICE_NAME: &str = "CodeLink API";
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub clones: Arc<CloneService>,
    pub delays: DelayConfig,
    pub log: SharedLog,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clones: Arc<CloneService>,
        delays: DelayConfig,
        log: SharedLog,
    ) -> Self {
        Self {
            store,
            clones,
            delays,
            log,
        }
    }

    /// Wires the filesystem store and the `git`-backed clone service from a
    /// loaded configuration.
    pub fn from_config(config: &CodelinkConfig) -> Result<Self, ProjectNameError> {
        let log: SharedLog = Arc::new(TracingLog::new(config.logging.detailed));
        let default_project = ProjectName::parse(&config.storage.default_project)?;
        let root = config.storage.projects_root.clone();

        let store = Arc::new(FsDocumentStore::new(
            root.clone(),
            default_project,
            log.clone(),
        ));
        let clones = Arc::new(CloneService::new(
            root,
            Arc::new(GitCli::new(&config.git.program)),
            log.clone(),
        ));

        Ok(Self::new(store, clones, config.delays.clone(), log))
    }

    /// Picks the requested project, or the configured default when none is
    /// given.
    pub(crate) fn project(&self, requested: Option<&str>) -> Result<ProjectName, ApiError> {
        match requested.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => ProjectName::parse(name)
                .map_err(|_| ApiError::BadRequest(error::INVALID_PROJECT_MESSAGE.to_owned())),
            None => Ok(self.store.default_project().clone()),
        }
    }

    pub(crate) async fn read_document(
        &self,
        project: ProjectName,
        document: Document,
    ) -> Result<Value, ApiError> {
        let store = self.store.clone();
        let read = tokio::task::spawn_blocking(move || store.read(&project, document)).await;
        self.joined(read)?.map_err(ApiError::from)
    }

    pub(crate) async fn write_document(
        &self,
        project: ProjectName,
        document: Document,
        value: Value,
    ) -> Result<(), ApiError> {
        let store = self.store.clone();
        let written =
            tokio::task::spawn_blocking(move || store.write(&project, document, &value)).await;
        self.joined(written)?.map_err(ApiError::from)
    }

    pub(crate) fn joined<T>(
        &self,
        result: Result<T, tokio::task::JoinError>,
    ) -> Result<T, ApiError> {
        result.map_err(|err| {
            self.log.error("Blocking task failed", &err);
            ApiError::Internal("Internal server error".to_owned())
        })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/branches", get(documents::branches))
        .route("/commits/{commit_id}/changes", get(documents::commit_changes))
        .route("/changes/{change_id}/explanation", get(documents::explanation))
        .route("/changes/{change_id}/tests", get(documents::unit_tests))
        .route("/changes/{change_id}/impacts", get(documents::impacts))
        .route(
            "/changes/{change_id}/edge-cases",
            post(documents::submit_edge_cases),
        )
        .route("/impacts/{impact_id}/deep-dive", get(documents::deep_dive))
        .route(
            "/test-state",
            get(documents::get_test_state).put(documents::put_test_state),
        )
        .route("/projects", get(projects::list_projects))
        .route("/projects/clone", post(projects::clone_project))
        .route("/projects/status", get(projects::project_status));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
