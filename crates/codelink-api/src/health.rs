use axum::Json;
use serde::Serialize;

use crate::API_VERSION;

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub(crate) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to CodeLink API",
        status: "online",
    })
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: API_VERSION,
    })
}
