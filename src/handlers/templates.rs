use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{ApiError, JsonBody};

/// Import (or replace) a template. The body may be URL-encoded.
pub async fn import_template(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<ImportTemplateRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if req.name.trim().is_empty() || req.template.is_empty() {
        return Err(ApiError::bad_request("name and template are required"));
    }
    let source = urlencoding::decode(&req.template)
        .map_err(|e| ApiError::bad_request(format!("template is not valid UTF-8 once decoded: {}", e)))?;

    tracing::info!("Importing {} template {} ({})", req.kind, req.name, req.description);
    if state
        .bootstrap
        .catalog()
        .import(&source, &req.name, &req.description, req.kind)
        .await
    {
        Ok(Json(StatusResponse::ok("Imported Template Successfully")))
    } else {
        Err(ApiError::internal("Could not import template"))
    }
}

/// Delete every template with the given name
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<TemplateNameRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if state.bootstrap.catalog().delete(&req.template_name).await {
        Ok(Json(StatusResponse::ok("Deleted Template Successfully")))
    } else {
        Err(ApiError::internal("Could not delete template"))
    }
}

/// List bootstrap templates
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TemplateListResponse>, ApiError> {
    list_by_type(&state, TemplateType::Bootstrap).await
}

/// List init-cfg templates
pub async fn list_init_cfg_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TemplateListResponse>, ApiError> {
    list_by_type(&state, TemplateType::InitCfg).await
}

async fn list_by_type(state: &AppState, kind: TemplateType) -> Result<Json<TemplateListResponse>, ApiError> {
    let templates = state.bootstrap.catalog().list(kind).await?;
    Ok(Json(TemplateListResponse {
        success: true,
        templates,
        status_code: 200,
    }))
}

/// Return a template's source as plain text. Without a type, bootstrap
/// templates are searched first, then init-cfg, then other.
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<TemplateNameRequest>,
) -> Result<Response, ApiError> {
    let catalog = state.bootstrap.catalog();
    let kinds: Vec<TemplateType> = match req.kind {
        Some(kind) => vec![kind],
        None => TemplateType::ALL.to_vec(),
    };

    for kind in kinds {
        if let Some(template) = catalog.get(&req.template_name, kind).await? {
            return Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                template.source,
            )
                .into_response());
        }
    }
    Err(ApiError::not_found("template"))
}
