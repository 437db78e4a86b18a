//! Repository for the `plugin` table.

use sqlx::PgPool;

use crate::models::plugin::{Plugin, STATUS_ENABLED};

const COLUMNS: &str = "id, name, status";

pub struct PluginRepo;

impl PluginRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<Plugin>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM plugin ORDER BY name");
        sqlx::query_as::<_, Plugin>(&query).fetch_all(pool).await
    }

    /// Names of enabled plugins, alphabetically.
    pub async fn list_enabled_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM plugin WHERE status = $1 ORDER BY name")
            .bind(STATUS_ENABLED)
            .fetch_all(pool)
            .await
    }
}
