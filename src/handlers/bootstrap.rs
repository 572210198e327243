use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::models::*;
use crate::render::discovery_payload;
use crate::AppState;

use super::{ApiError, JsonBody};

const ARCHIVE_PATH_HEADER: HeaderName = HeaderName::from_static("x-archive-path");

/// Build a bootstrap package and return it as a download
pub async fn generate_bootstrap_package(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Response, ApiError> {
    let request = RenderRequest::from_json(&body)?;
    let archive = state.bootstrap.generate(&request).await?;

    let bytes = tokio::fs::read(&archive.path).await.map_err(|e| {
        tracing::error!("Could not read archive {}: {}", archive.path.display(), e);
        ApiError::internal("Could not create archive! Check bootstrapper logs for more information")
    })?;

    if !state.config.keep_archives {
        if let Err(e) = tokio::fs::remove_file(&archive.path).await {
            tracing::warn!("Could not remove archive {}: {}", archive.path.display(), e);
        }
    }

    Ok((
        [
            (header::CONTENT_TYPE, archive.archive_type.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", archive.file_name()),
            ),
            (ARCHIVE_PATH_HEADER, archive.path.display().to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// List the variables a request's templates need, as a ready-to-fill request body
pub async fn get_bootstrap_variables(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!("Compiling variables required to generate a bootstrap archive");
    let request = RenderRequest::from_json(&body)?;
    let variables = state.bootstrap.required_variables(&request).await?;
    let payload = discovery_payload(&request, &variables, DiscoveryFormat::from_request(&body));

    Ok(Json(serde_json::json!({
        "success": true,
        "payload": payload,
        "status_code": 200,
    })))
}
