use axum::Json;
use axum::extract::{Path, State};
use codelink_core::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::extract::{ApiJson, ApiQuery};
use crate::{ApiError, AppState, pause};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectQuery {
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EdgeCasesRequest {
    #[serde(rename = "edgeCases")]
    pub edge_cases: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EdgeCasesResponse {
    pub success: bool,
    pub message: &'static str,
    pub change_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestStateRequest {
    pub branches: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeepDiveResponse {
    pub analysis: Value,
}

/// Sub-key lookup inside a document that was read successfully. Missing keys
/// (or a document that is not an object) fall back to the caller's default.
fn entry(document: &Value, key: &str) -> Option<Value> {
    document.as_object()?.get(key).cloned()
}

async fn document_entry(
    state: &AppState,
    query: ProjectQuery,
    document: Document,
    key: &str,
) -> Result<Option<Value>, ApiError> {
    let project = state.project(query.project.as_deref())?;
    pause(state.delays.api_response()).await;
    let value = state.read_document(project, document).await?;
    Ok(entry(&value, key))
}

pub(crate) async fn branches(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let project = state.project(query.project.as_deref())?;
    state.log.info("Fetching branches");
    pause(state.delays.api_response()).await;
    let branches = state.read_document(project, Document::Branches).await?;
    Ok(Json(branches))
}

pub(crate) async fn commit_changes(
    State(state): State<AppState>,
    Path(commit_id): Path<String>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    state
        .log
        .info(&format!("Fetching changes for commit: {commit_id}"));
    let changes = document_entry(&state, query, Document::FileChanges, &commit_id).await?;
    Ok(Json(changes.unwrap_or_else(|| json!([]))))
}

pub(crate) async fn explanation(
    State(state): State<AppState>,
    Path(change_id): Path<String>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    state
        .log
        .info(&format!("Fetching explanation for change: {change_id}"));
    let explanation = document_entry(&state, query, Document::Explanations, &change_id).await?;
    Ok(Json(explanation.unwrap_or(Value::Null)))
}

pub(crate) async fn unit_tests(
    State(state): State<AppState>,
    Path(change_id): Path<String>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    state
        .log
        .info(&format!("Fetching tests for change: {change_id}"));
    let tests = document_entry(&state, query, Document::UnitTests, &change_id).await?;
    Ok(Json(tests.unwrap_or_else(|| json!([]))))
}

pub(crate) async fn impacts(
    State(state): State<AppState>,
    Path(change_id): Path<String>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    state
        .log
        .info(&format!("Fetching impacts for change: {change_id}"));
    let impacts = document_entry(&state, query, Document::Impacts, &change_id).await?;
    Ok(Json(impacts.unwrap_or_else(|| json!([]))))
}

pub(crate) async fn deep_dive(
    State(state): State<AppState>,
    Path(impact_id): Path<String>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<DeepDiveResponse>, ApiError> {
    state
        .log
        .info(&format!("Fetching deep dive analysis for impact: {impact_id}"));
    let analysis = document_entry(&state, query, Document::DeepDiveAnalysis, &impact_id).await?;
    Ok(Json(DeepDiveResponse {
        analysis: analysis.unwrap_or(Value::Null),
    }))
}

/// Edge cases are validated and logged, then dropped: nothing is stored.
pub(crate) async fn submit_edge_cases(
    State(state): State<AppState>,
    Path(change_id): Path<String>,
    ApiJson(request): ApiJson<EdgeCasesRequest>,
) -> Json<EdgeCasesResponse> {
    state.log.info(&format!(
        "Received edge cases for change {change_id}: {}",
        request.edge_cases
    ));
    pause(state.delays.edge_case_submission()).await;

    Json(EdgeCasesResponse {
        success: true,
        message: "Edge cases received successfully",
        change_id,
    })
}

pub(crate) async fn get_test_state(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let project = state.project(query.project.as_deref())?;
    state.log.info("Fetching test state");
    pause(state.delays.test_state_sync()).await;
    let test_state = state.read_document(project, Document::TestState).await?;
    Ok(Json(test_state))
}

pub(crate) async fn put_test_state(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
    ApiJson(request): ApiJson<TestStateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let project = state.project(query.project.as_deref())?;
    state.log.info("Updating test state");
    pause(state.delays.test_state_sync()).await;

    let document = json!({ "branches": request.branches });
    state
        .write_document(project, Document::TestState, document)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}
