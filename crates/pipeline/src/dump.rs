//! Data dump export and import.

use std::path::{Path, PathBuf};

use sqlx::PgPool;
use themesmith_core::data_dump::{builtin_tables, merge_table_exports, DataDump, PAGE_TABLE};
use themesmith_core::theme::THEME_DATA_FILE;
use themesmith_db::models::dump::ReplayReport;
use themesmith_db::repositories::DumpRepo;

use crate::error::{ThemeError, ThemeResult};
use crate::plugins::PluginRegistry;

/// A dump collected from the live database.
#[derive(Debug, Clone, Default)]
pub struct DumpExport {
    pub dump: DataDump,
    /// Media paths contributed by plugins.
    pub plugin_media: Vec<String>,
    /// Plugin tables refused because the name was reserved or unusable.
    pub ignored_tables: Vec<String>,
}

pub struct DataDumpCodec {
    pool: PgPool,
    plugins: PluginRegistry,
}

impl DataDumpCodec {
    pub fn new(pool: PgPool, plugins: PluginRegistry) -> Self {
        Self { pool, plugins }
    }

    /// Collect pages, plugin contributions and every scoped table.
    pub async fn export(&self) -> ThemeResult<DumpExport> {
        let mut pages = DumpRepo::fetch_export_pages(&self.pool).await?;
        let mut tables = builtin_tables();
        let mut export = DumpExport::default();

        for (plugin, contribution) in self.plugins.collect_exports(&self.pool).await? {
            pages.extend(contribution.pages);
            let ignored = merge_table_exports(&mut tables, contribution.tables);
            if !ignored.is_empty() {
                tracing::warn!(
                    plugin = %plugin,
                    tables = ?ignored,
                    "Ignoring reserved plugin tables",
                );
            }
            export.ignored_tables.extend(ignored);
            export.plugin_media.extend(contribution.media);
        }

        if !pages.is_empty() {
            export.dump.insert(PAGE_TABLE, pages);
        }
        let page_ids = export.dump.page_ids();

        for table in &tables {
            let rows = DumpRepo::fetch_table(&self.pool, table, &page_ids).await?;
            export.dump.insert(table.table.clone(), rows);
        }

        tracing::debug!(
            pages = page_ids.len(),
            tables = tables.len(),
            "Data dump exported",
        );
        Ok(export)
    }

    /// Write `dump` as the theme's data file.
    pub async fn write(dump: &DataDump, theme_path: &Path) -> ThemeResult<PathBuf> {
        let path = theme_path.join(THEME_DATA_FILE);
        let text = dump.to_json_pretty()?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| ThemeError::io(&path, e))?;
        Ok(path)
    }

    /// Read the theme's data file. `None` when the theme ships no data.
    pub async fn read(theme_path: &Path) -> ThemeResult<Option<DataDump>> {
        let path = theme_path.join(THEME_DATA_FILE);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ThemeError::io(&path, e)),
        };
        Ok(Some(DataDump::parse(&text)?))
    }

    /// Replace table contents with the dump.
    pub async fn import(&self, dump: &DataDump) -> ThemeResult<ReplayReport> {
        let report = DumpRepo::replay(&self.pool, dump).await?;
        tracing::info!(
            tables = report.tables.len(),
            inserted = report.inserted_total(),
            skipped = report.skipped_rows.len(),
            "Data dump replayed",
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn read_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(DataDumpCodec::read(tmp.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let mut dump = DataDump::new();
        dump.insert(
            PAGE_TABLE,
            vec![json!({"id": 1, "url": "index.html"}).as_object().cloned().unwrap()],
        );
        let path = DataDumpCodec::write(&dump, tmp.path()).await.unwrap();
        assert!(path.ends_with(THEME_DATA_FILE));
        assert_eq!(DataDumpCodec::read(tmp.path()).await.unwrap(), Some(dump));
    }

    #[tokio::test]
    async fn malformed_file_surfaces_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join(THEME_DATA_FILE), "{\"page\": [")
            .await
            .unwrap();
        assert_matches!(
            DataDumpCodec::read(tmp.path()).await,
            Err(ThemeError::Dump(_))
        );
    }
}
