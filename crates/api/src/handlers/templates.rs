//! Handlers for stored templates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use themesmith_core::error::CoreError;
use themesmith_core::template::TemplateType;
use themesmith_db::models::template::Template;
use themesmith_db::repositories::TemplateRepo;
use themesmith_pipeline::store::SaveTemplate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    /// Optional type filter (e.g. `typemobile`).
    #[serde(rename = "type")]
    pub template_type: Option<String>,
}

/// GET /api/v1/templates
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<TemplateQuery>,
) -> AppResult<Json<DataResponse<Vec<Template>>>> {
    let filter = params
        .template_type
        .as_deref()
        .map(TemplateType::from_name)
        .transpose()?;
    let templates = TemplateRepo::list(&state.pool, filter.map(TemplateType::as_str)).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{name}
pub async fn get_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<DataResponse<Template>>> {
    let template = TemplateRepo::find_by_name(&state.pool, &name)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "template",
            key: name,
        })?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/templates
///
/// Create a template, or update the one named by `original_name`.
pub async fn save_template(
    State(state): State<AppState>,
    Json(input): Json<SaveTemplate>,
) -> AppResult<(StatusCode, Json<DataResponse<Template>>)> {
    let status = if input.original_name.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let template = state.template_store().save_template(&input).await?;
    Ok((status, Json(DataResponse { data: template })))
}

/// DELETE /api/v1/templates/{name}
pub async fn delete_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.template_store().delete_template(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
