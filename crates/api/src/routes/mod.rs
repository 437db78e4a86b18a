pub mod health;
pub mod templates;
pub mod themes;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /themes                 list or export (GET ?name=), upload (POST multipart)
/// /themes/{name}          apply (PUT), delete (DELETE)
///
/// /templates              list (GET ?type=), save (POST)
/// /templates/{name}       get, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/themes", themes::router())
        .nest("/templates", templates::router())
}
