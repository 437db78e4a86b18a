//! Repository for the `config` key-value table.

use sqlx::PgPool;

use crate::models::config::CURRENT_THEME_KEY;

pub struct ConfigRepo;

impl ConfigRepo {
    pub async fn get(pool: &PgPool, name: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT value FROM config WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Insert or overwrite a config value.
    pub async fn set(pool: &PgPool, name: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO config (name, value) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(name)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Name of the active theme, if one has been applied.
    pub async fn current_theme(pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
        let value = Self::get(pool, CURRENT_THEME_KEY).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    pub async fn set_current_theme(pool: &PgPool, theme: &str) -> Result<(), sqlx::Error> {
        Self::set(pool, CURRENT_THEME_KEY, theme).await
    }
}
