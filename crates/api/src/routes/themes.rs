use axum::routing::{get, put};
use axum::Router;

use crate::handlers::themes;
use crate::state::AppState;

/// Theme routes mounted at `/themes`.
///
/// ```text
/// GET    /         -> list_or_export
/// POST   /         -> upload_theme
/// PUT    /{name}   -> apply_theme
/// DELETE /{name}   -> delete_theme
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(themes::list_or_export).post(themes::upload_theme))
        .route(
            "/{name}",
            put(themes::apply_theme).delete(themes::delete_theme),
        )
}
