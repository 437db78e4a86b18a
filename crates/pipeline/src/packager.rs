//! Theme Packager: assembles theme exports.
//!
//! An export always starts from the theme directory. A full export adds
//! the data dump and the media its pages reference. The result is either
//! copied into the theme directory itself (used as the pre-apply backup)
//! or packed into a zip archive staged under the archive directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use themesmith_core::data_dump::PAGE_TABLE;
use themesmith_core::error::CoreError;
use themesmith_core::media::{collect_candidates, theme_destination, MediaSet};
use themesmith_core::template::TemplateTypeMap;
use themesmith_core::theme::{ExportOptions, THEME_CONFIG_FILE};
use themesmith_db::repositories::{ConfigRepo, TemplateRepo};

use crate::archive::{self, ArchiveEntry};
use crate::dump::{DataDumpCodec, DumpExport};
use crate::error::{ThemeError, ThemeResult};
use crate::files::copy_file;
use crate::media::MediaResolver;
use crate::plugins::PluginRegistry;
use crate::settings::ThemeSettings;

/// Where an export ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Copy media into the theme's own `media/` and `previews/` folders.
    CopyInPlace,
    /// Pack the theme into a staged zip archive.
    Archive,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeExport {
    pub theme: String,
    /// Staged archive, for [`ExportMode::Archive`]. The caller removes it.
    pub archive: Option<PathBuf>,
    /// Media carried by the export.
    pub media: MediaSet,
    /// Tables written to the data dump, empty when no dump was written.
    pub tables: Vec<String>,
}

pub struct ThemePackager {
    pool: PgPool,
    settings: Arc<ThemeSettings>,
    plugins: PluginRegistry,
}

impl ThemePackager {
    pub fn new(pool: PgPool, settings: Arc<ThemeSettings>, plugins: PluginRegistry) -> Self {
        Self {
            pool,
            settings,
            plugins,
        }
    }

    pub async fn export(
        &self,
        theme: &str,
        options: ExportOptions,
        mode: ExportMode,
    ) -> ThemeResult<ThemeExport> {
        let theme_path = self.settings.theme_path(theme)?;
        if !tokio::fs::metadata(&theme_path).await.is_ok_and(|m| m.is_dir()) {
            return Err(CoreError::NotFound {
                entity: "theme",
                key: theme.to_string(),
            }
            .into());
        }

        if ConfigRepo::current_theme(&self.pool).await?.as_deref() == Some(theme) {
            self.write_type_map(&theme_path).await?;
        }

        let mut result = ThemeExport {
            theme: theme.to_string(),
            archive: None,
            media: MediaSet::default(),
            tables: Vec::new(),
        };

        if options.is_full() {
            let codec = DataDumpCodec::new(self.pool.clone(), self.plugins.clone());
            let export = codec.export().await?;
            result.media = self.resolve_media(&export, options).await?;

            if options.includes_data() {
                DataDumpCodec::write(&export.dump, &theme_path).await?;
                result.tables = export.dump.table_names().map(str::to_string).collect();
            }
        }

        match mode {
            ExportMode::CopyInPlace => {
                self.copy_media_into(&theme_path, &result.media).await?;
            }
            ExportMode::Archive => {
                let archive = self.pack(theme, &theme_path, &result.media, options).await?;
                result.archive = Some(archive);
            }
        }

        tracing::info!(
            theme = %theme,
            full = options.is_full(),
            media_files = result.media.files.len(),
            media_bytes = result.media.total_bytes,
            "Theme exported",
        );
        Ok(result)
    }

    /// Write the stored template types into `theme`'s `theme.ini`.
    ///
    /// Apply calls this for the outgoing theme before non-protected
    /// templates are cleared, since its later backup can no longer see them.
    pub async fn snapshot_template_types(&self, theme: &str) -> ThemeResult<()> {
        let theme_path = self.settings.theme_path(theme)?;
        if !tokio::fs::metadata(&theme_path).await.is_ok_and(|m| m.is_dir()) {
            tracing::debug!(theme = %theme, "No theme directory for template types");
            return Ok(());
        }
        self.write_type_map(&theme_path).await
    }

    /// Snapshot stored template types into the theme's `theme.ini`.
    async fn write_type_map(&self, theme_path: &Path) -> ThemeResult<()> {
        let templates = TemplateRepo::list(&self.pool, None).await?;
        let map: TemplateTypeMap = templates
            .into_iter()
            .map(|t| (t.name, t.template_type))
            .collect();
        let path = theme_path.join(THEME_CONFIG_FILE);
        tokio::fs::write(&path, map.to_ini())
            .await
            .map_err(|e| ThemeError::io(&path, e))
    }

    async fn resolve_media(
        &self,
        export: &DumpExport,
        options: ExportOptions,
    ) -> ThemeResult<MediaSet> {
        let pages = export.dump.rows(PAGE_TABLE).unwrap_or_default();
        if pages.is_empty() || !(options.includes_media() || options.includes_teasers()) {
            return Ok(MediaSet::default());
        }
        let containers = export.dump.rows("container").unwrap_or_default();
        let candidates = collect_candidates(pages, containers, &export.plugin_media)?
            .into_iter()
            .filter(|path| options.accepts_media_path(path))
            .collect();

        let set = MediaResolver::new(&self.settings).measure(candidates).await;
        if let Err(ThemeError::Core(CoreError::PayloadTooLarge(msg))) = &set {
            tracing::warn!(error = %msg, "Export aborted");
        }
        set
    }

    async fn copy_media_into(&self, theme_path: &Path, media: &MediaSet) -> ThemeResult<()> {
        let copies = self.media_entries(media);
        let theme_path = theme_path.to_path_buf();
        tokio::task::spawn_blocking(move || -> ThemeResult<()> {
            for entry in copies {
                copy_file(&entry.source, &theme_path.join(&entry.name))?;
            }
            Ok(())
        })
        .await?
    }

    async fn pack(
        &self,
        theme: &str,
        theme_path: &Path,
        media: &MediaSet,
        options: ExportOptions,
    ) -> ThemeResult<PathBuf> {
        let entries = self.media_entries(media);
        let excluded = options.excluded_paths();
        let dest = self
            .settings
            .archive_dir
            .join(format!("{}-{theme}.zip", uuid::Uuid::now_v7()));
        let theme_path = theme_path.to_path_buf();
        let archive_path = dest.clone();

        let count = tokio::task::spawn_blocking(move || {
            archive::pack(&theme_path, &entries, &excluded, &archive_path)
        })
        .await??;

        tracing::debug!(
            theme = %theme,
            entries = count,
            path = %dest.display(),
            "Archive staged",
        );
        Ok(dest)
    }

    /// Live source and theme-layout destination of each media file.
    fn media_entries(&self, media: &MediaSet) -> Vec<ArchiveEntry> {
        let resolver = MediaResolver::new(&self.settings);
        media
            .files
            .iter()
            .filter_map(|file| {
                theme_destination(&file.path).map(|name| ArchiveEntry {
                    source: resolver.source_path(file),
                    name,
                })
            })
            .collect()
    }
}
