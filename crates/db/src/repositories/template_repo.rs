//! Repository for the `template` table.

use sqlx::PgPool;

use crate::models::template::{CreateTemplate, Template, UpdateTemplate};

/// Column list for template queries.
const COLUMNS: &str = "id, name, content, type, created_at, updated_at";

/// Provides CRUD operations for stored templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a new template, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateTemplate) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO template (name, content, type) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .bind(&input.content)
            .bind(input.template_type.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM template WHERE name = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List templates ordered by name, optionally restricted to one type.
    pub async fn list(
        pool: &PgPool,
        template_type: Option<&str>,
    ) -> Result<Vec<Template>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template \
             WHERE ($1::TEXT IS NULL OR type = $1) \
             ORDER BY name"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(template_type)
            .fetch_all(pool)
            .await
    }

    pub async fn list_names(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM template ORDER BY name")
            .fetch_all(pool)
            .await
    }

    /// Update the template currently named `current_name`.
    /// Returns `None` if no such template exists.
    pub async fn update_by_name(
        pool: &PgPool,
        current_name: &str,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE template SET \
                name       = COALESCE($1, name), \
                content    = COALESCE($2, content), \
                type       = COALESCE($3, type), \
                updated_at = NOW() \
             WHERE name = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .bind(&input.content)
            .bind(input.template_type.map(|t| t.as_str()))
            .bind(current_name)
            .fetch_optional(pool)
            .await
    }

    /// Delete a template by name. Returns `true` if a row was deleted.
    pub async fn delete_by_name(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM template WHERE name = $1")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every template whose name is not in `keep`.
    /// Returns the number of rows removed.
    pub async fn delete_except(pool: &PgPool, keep: &[String]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM template WHERE NOT (name = ANY($1))")
            .bind(keep)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
