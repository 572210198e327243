use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::AppState;

use super::{ApiError, JsonBody};

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    #[serde(default)]
    pub contents: Option<Value>,
}

/// Store any JSON value and return the key to fetch it with
pub async fn set_object(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SetRequest>,
) -> Result<Json<Value>, ApiError> {
    let contents = req
        .contents
        .filter(|c| !c.is_null())
        .ok_or_else(|| ApiError::bad_request("contents is required"))?;
    let key = state.cache.set(contents).await;
    Ok(Json(serde_json::json!({"key": key, "success": true})))
}

/// Fetch a cached value by key
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .cache
        .get(&key)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("cache key"))
}
