//! Handlers for theme listing, export, apply, upload and deletion.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use themesmith_core::theme::{ExportOptions, ThemeKind};
use themesmith_pipeline::applier::ApplyReport;
use themesmith_pipeline::packager::ExportMode;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /themes`.
///
/// Without `name` the themes are listed; with it the named theme is
/// exported as a zip download. Toggles are `1`/`0` and default to `1`.
#[derive(Debug, Default, Deserialize)]
pub struct ThemeQuery {
    pub name: Option<String>,
    #[serde(default)]
    pub kind: ThemeKind,
    pub sql: Option<u8>,
    pub media: Option<u8>,
    pub teasers: Option<u8>,
}

impl ThemeQuery {
    pub fn export_options(&self) -> ExportOptions {
        let on = |flag: Option<u8>| flag.unwrap_or(1) != 0;
        ExportOptions {
            kind: self.kind,
            sql: on(self.sql),
            media: on(self.media),
            teasers: on(self.teasers),
        }
    }
}

/// Body of `PUT /themes/{name}`. A request without a body applies
/// templates only.
#[derive(Debug, Default, Deserialize)]
pub struct ApplyThemeRequest {
    #[serde(rename = "applyData", default)]
    pub apply_data: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadedTheme {
    pub name: String,
    pub files: Vec<String>,
}

/// GET /api/v1/themes
pub async fn list_or_export(
    State(state): State<AppState>,
    Query(params): Query<ThemeQuery>,
) -> AppResult<Response> {
    match params.name.as_deref() {
        Some(name) => export_theme(&state, name, params.export_options()).await,
        None => {
            let themes = state.catalog().list().await?;
            Ok(Json(DataResponse { data: themes }).into_response())
        }
    }
}

async fn export_theme(state: &AppState, name: &str, options: ExportOptions) -> AppResult<Response> {
    let export = state
        .packager()
        .export(name, options, ExportMode::Archive)
        .await?;
    let path = export
        .archive
        .ok_or_else(|| AppError::InternalError("Export produced no archive".into()))?;

    let bytes = tokio::fs::read(&path).await;
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged archive");
    }
    let bytes =
        bytes.map_err(|e| AppError::InternalError(format!("Failed to read archive: {e}")))?;

    tracing::info!(
        theme = %name,
        kind = ?options.kind,
        bytes = bytes.len(),
        "Theme export served",
    );

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}.zip\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// PUT /api/v1/themes/{name}
///
/// Apply a theme, optionally replaying its data dump and media.
pub async fn apply_theme(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<ApplyThemeRequest>>,
) -> AppResult<Json<DataResponse<ApplyReport>>> {
    let Json(input) = body.unwrap_or_default();
    let report = state.applier().apply(&name, input.apply_data).await?;
    Ok(Json(DataResponse { data: report }))
}

/// DELETE /api/v1/themes/{name}
pub async fn delete_theme(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.catalog().delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/themes
///
/// Install an uploaded `.zip` as a new theme named after the file.
pub async fn upload_theme(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadedTheme>>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = archive_theme_name(&file_name).ok_or_else(|| {
            AppError::BadRequest(format!("'{file_name}' is not a .zip theme archive"))
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let files = state.catalog().install(&name, bytes.to_vec()).await?;
        return Ok((
            StatusCode::CREATED,
            Json(DataResponse {
                data: UploadedTheme { name, files },
            }),
        ));
    }

    Err(AppError::BadRequest(
        "No theme archive received in multipart upload".to_string(),
    ))
}

/// Theme name from an uploaded archive file name: its base name without
/// the `.zip` extension.
fn archive_theme_name(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next()?;
    if !base.to_ascii_lowercase().ends_with(".zip") {
        return None;
    }
    let stem = &base[..base.len() - ".zip".len()];
    (!stem.is_empty()).then(|| stem.to_string())
}
