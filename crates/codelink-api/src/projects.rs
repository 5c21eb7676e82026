use axum::Json;
use axum::extract::State;
use codelink_git::{CloneOutcome, CloneRequest};
use codelink_store::ProjectSummary;
use serde::{Deserialize, Serialize};

use crate::extract::{ApiJson, ApiQuery};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct CloneProjectRequest {
    #[serde(alias = "repoUrl")]
    pub url: String,
    #[serde(default, rename = "projectName")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CloneStatus {
    Success,
    Exists,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CloneProjectResponse {
    pub status: CloneStatus,
    pub success: bool,
    pub project: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub suggest_rename: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectStatusQuery {
    #[serde(rename = "repoUrl")]
    pub repo_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectStatusResponse {
    pub cloned: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectListResponse {
    pub projects: Vec<ProjectSummary>,
}

/// Blocks for the whole clone; there is no timeout and no progress reporting.
pub(crate) async fn clone_project(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CloneProjectRequest>,
) -> Result<Json<CloneProjectResponse>, ApiError> {
    let request = CloneRequest {
        url: request.url,
        project_name: request.project_name,
    };
    state
        .log
        .info(&format!("Clone requested for {}", request.url.trim()));

    let clones = state.clones.clone();
    let outcome = tokio::task::spawn_blocking(move || clones.clone_project(&request)).await;
    let outcome = state.joined(outcome)??;

    match outcome {
        CloneOutcome::Cloned { project, head } => Ok(Json(CloneProjectResponse {
            status: CloneStatus::Success,
            success: true,
            message: format!("Repository cloned as '{project}'."),
            project: project.into(),
            head,
            suggest_rename: false,
        })),
        CloneOutcome::Exists {
            project,
            explicit_name: true,
        } => Err(ApiError::conflict(project)),
        CloneOutcome::Exists {
            project,
            explicit_name: false,
        } => Ok(Json(CloneProjectResponse {
            status: CloneStatus::Exists,
            success: false,
            message: format!(
                "A project named '{project}' already exists. Choose a different project name."
            ),
            project: project.into(),
            head: None,
            suggest_rename: true,
        })),
    }
}

pub(crate) async fn project_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProjectStatusQuery>,
) -> Result<Json<ProjectStatusResponse>, ApiError> {
    let cloned = state.clones.is_cloned(&query.repo_url)?;
    Ok(Json(ProjectStatusResponse { cloned }))
}

pub(crate) async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<ProjectListResponse>, ApiError> {
    let store = state.store.clone();
    let listed = tokio::task::spawn_blocking(move || store.list_projects()).await;
    let projects = state.joined(listed)??;
    Ok(Json(ProjectListResponse { projects }))
}
