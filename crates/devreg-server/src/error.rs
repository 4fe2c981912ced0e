use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use devreg_sync::{StartupFailure, SyncError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Startup(#[from] StartupFailure),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("failed to pull the devfile of {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: SyncError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Lookup { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            Self::Lookup { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Lookup { name, source } => json!({
                "error": source.to_string(),
                "status": format!("failed to pull the devfile of {name}"),
            }),
            other => json!({
                "error": other.to_string(),
                "status": "internal server error",
            }),
        };
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
