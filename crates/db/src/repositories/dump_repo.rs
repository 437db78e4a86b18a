//! Export and replay of theme data dumps.
//!
//! Rows travel as JSON objects in both directions: export wraps each
//! table query in `row_to_json`, and replay rebuilds typed rows with
//! `jsonb_populate_record`, so no per-table structs are needed.

use sqlx::{Connection, PgConnection, PgPool};
use themesmith_core::data_dump::{
    is_valid_table_name, DataDump, TableExport, OPTIMIZED_TABLE, PAGE_TABLE,
};
use themesmith_core::types::{DbId, Row};

use crate::models::dump::{ReplayReport, SkippedRow, TableReplay};

/// Pages carried by a full theme: the index, top-level menu pages and their
/// children, footer-menu pages, and pages with page options. System pages
/// and drafts never travel.
const EXPORT_PAGES_QUERY: &str = "\
    SELECT * FROM page p \
    WHERE p.system = FALSE AND p.draft = FALSE AND ( \
        p.url = 'index.html' \
        OR (p.parent_id = 0 AND p.show_in_menu = 1) \
        OR (p.parent_id = -1 AND p.show_in_menu = 2) \
        OR p.parent_id IN ( \
            SELECT id FROM page \
            WHERE parent_id = 0 AND show_in_menu = 1 AND system = FALSE \
        ) \
        OR p.id IN (SELECT DISTINCT page_id FROM page_has_option) \
    ) \
    ORDER BY p.\"order\", p.id";

pub struct DumpRepo;

impl DumpRepo {
    /// Page rows selected for a full export, in display order.
    pub async fn fetch_export_pages(pool: &PgPool) -> Result<Vec<Row>, sqlx::Error> {
        let values: Vec<serde_json::Value> = sqlx::query_scalar(&wrap_as_json(EXPORT_PAGES_QUERY))
            .fetch_all(pool)
            .await?;
        Ok(into_rows(values))
    }

    /// Run one export query. Page-scoped queries receive `page_ids` as `$1`.
    pub async fn fetch_table(
        pool: &PgPool,
        export: &TableExport,
        page_ids: &[DbId],
    ) -> Result<Vec<Row>, sqlx::Error> {
        let query = wrap_as_json(&export.query);
        let mut q = sqlx::query_scalar::<_, serde_json::Value>(&query);
        if export.page_scoped {
            q = q.bind(page_ids);
        }
        let values = q.fetch_all(pool).await?;
        Ok(into_rows(values))
    }

    /// Replace the contents of every non-empty dump table.
    ///
    /// Runs in one transaction with foreign-key triggers suspended. When the
    /// dump carries pages the `optimized` cache is emptied first. Each table
    /// is cleared and then reloaded row by row; a row the database rejects
    /// is rolled back to its own savepoint and reported, and loading
    /// continues. Any other failure rolls the whole replay back.
    ///
    /// Suspending triggers through `session_replication_role` requires a
    /// superuser (or `SET` privilege on that parameter).
    pub async fn replay(pool: &PgPool, dump: &DataDump) -> Result<ReplayReport, sqlx::Error> {
        let mut report = ReplayReport::default();
        let mut tx = pool.begin().await?;

        sqlx::query("SET LOCAL session_replication_role = replica")
            .execute(&mut *tx)
            .await?;

        if dump.contains(PAGE_TABLE) {
            let purged = sqlx::query(&format!("DELETE FROM {OPTIMIZED_TABLE}"))
                .execute(&mut *tx)
                .await?;
            report.optimized_purged = purged.rows_affected();
        }

        for (table, rows) in dump.non_empty_tables() {
            if !is_valid_table_name(table) || !table_exists(&mut tx, table).await? {
                tracing::warn!(table = %table, "Skipping dump table missing from database");
                report.missing_tables.push(table.to_string());
                continue;
            }

            let deleted = sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?
                .rows_affected();

            let mut inserted = 0;
            for (index, row) in rows.iter().enumerate() {
                match insert_row(&mut tx, table, row).await? {
                    Ok(()) => inserted += 1,
                    Err(error) => {
                        tracing::warn!(table = %table, index, error = %error, "Skipping dump row");
                        report.skipped_rows.push(SkippedRow {
                            table: table.to_string(),
                            index,
                            error,
                        });
                    }
                }
            }

            reset_id_sequence(&mut tx, table).await?;

            tracing::debug!(table = %table, deleted, inserted, "Replayed dump table");
            report.tables.push(TableReplay {
                table: table.to_string(),
                deleted,
                inserted,
            });
        }

        sqlx::query("SET LOCAL session_replication_role = origin")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn wrap_as_json(query: &str) -> String {
    format!("SELECT row_to_json(t)::jsonb FROM ({query}) t")
}

fn into_rows(values: Vec<serde_json::Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

async fn table_exists(conn: &mut PgConnection, table: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(table)
        .fetch_one(conn)
        .await
}

/// Insert one row inside a savepoint.
///
/// The outer `Result` carries connection-level failures; the inner one a
/// rejection of this row only.
async fn insert_row(
    conn: &mut PgConnection,
    table: &str,
    row: &Row,
) -> Result<Result<(), String>, sqlx::Error> {
    if let Some(bad) = row.keys().find(|k| !is_valid_table_name(k)) {
        return Ok(Err(format!("Invalid column name '{bad}'")));
    }
    if row.is_empty() {
        return Ok(Err("Empty row".to_string()));
    }

    let columns = row
        .keys()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "INSERT INTO {table} ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)"
    );

    let mut savepoint = conn.begin().await?;
    let result = sqlx::query(&query)
        .bind(serde_json::Value::Object(row.clone()))
        .execute(&mut *savepoint)
        .await;

    match result {
        Ok(_) => {
            savepoint.commit().await?;
            Ok(Ok(()))
        }
        Err(sqlx::Error::Database(db_err)) => {
            savepoint.rollback().await?;
            Ok(Err(db_err.message().to_string()))
        }
        Err(other) => Err(other),
    }
}

/// Move the `id` sequence of `table` past the highest replayed id.
async fn reset_id_sequence(conn: &mut PgConnection, table: &str) -> Result<(), sqlx::Error> {
    let sequence: Option<Option<String>> = sqlx::query_scalar(
        "SELECT pg_get_serial_sequence($1, 'id') \
         FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 AND column_name = 'id'",
    )
    .bind(table)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(Some(sequence)) = sequence else {
        return Ok(());
    };

    sqlx::query(&format!(
        "SELECT setval($1::regclass, COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
    ))
    .bind(sequence)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
