use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use devreg_sync::Catalog;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Shared by every request. Read-only after startup.
#[derive(Clone, Debug)]
pub struct AppState {
    pub catalog: Catalog,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            message: "the server is up and running".into(),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Pull a stack's `devfile.yaml` out of the registry.
pub async fn devfile_handler(State(state): State<AppState>, Path(name): Path<String>) -> ServerResult<Response> {
    let resolved = state
        .catalog
        .resolve(&name)
        .await
        .map_err(|source| ServerError::Lookup { name, source })?;
    Ok(([(header::CONTENT_TYPE, resolved.content_type)], resolved.data).into_response())
}

/// The index file, byte for byte.
pub async fn index_handler(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.catalog.index().raw_json(),
    )
        .into_response()
}
