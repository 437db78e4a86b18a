use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use themesmith_core::error::CoreError;
use themesmith_pipeline::ThemeError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`ThemeError`] for domain failures and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure from the theme pipeline.
    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String, Option<Vec<String>>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Theme(theme) => classify_theme_error(theme),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        None,
    )
}

fn classify_core_error(core: &CoreError) -> ErrorParts {
    match core {
        CoreError::NotFound { entity, key } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} '{key}' not found"),
            None,
        ),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            msg.clone(),
            None,
        ),
        CoreError::InvalidTheme(messages) => (
            StatusCode::BAD_REQUEST,
            "INVALID_THEME",
            "Theme is not valid".to_string(),
            Some(messages.clone()),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None),
        CoreError::PayloadTooLarge(msg) => (
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            msg.clone(),
            None,
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

fn classify_theme_error(err: &ThemeError) -> ErrorParts {
    match err {
        ThemeError::Core(core) => classify_core_error(core),
        ThemeError::Database(db) => classify_sqlx_error(db),
        ThemeError::NoThemes(msg) => (StatusCode::NOT_FOUND, "NO_THEMES", msg.to_string(), None),
        ThemeError::Dump(e) => (
            StatusCode::BAD_REQUEST,
            "INVALID_DUMP",
            e.to_string(),
            None,
        ),
        ThemeError::Archive(e) => (
            StatusCode::BAD_REQUEST,
            "INVALID_ARCHIVE",
            e.to_string(),
            None,
        ),
        ThemeError::Io { .. } | ThemeError::Task(_) => {
            tracing::error!(error = %err, "Theme pipeline error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                        None,
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
