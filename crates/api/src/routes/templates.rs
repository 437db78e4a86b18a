use axum::routing::get;
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Template routes mounted at `/templates`.
///
/// ```text
/// GET    /         -> list_templates
/// POST   /         -> save_template
/// GET    /{name}   -> get_template
/// DELETE /{name}   -> delete_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(templates::list_templates).post(templates::save_template),
        )
        .route(
            "/{name}",
            get(templates::get_template).delete(templates::delete_template),
        )
}
