//! Theme Applier: makes a theme the current one.
//!
//! ```text
//! Idle -> TemplatesSynced -> [DataReplayed] -> [MediaImported] -> Applied
//! ```
//!
//! Template sync runs first and is the only step whose failure fails the
//! apply. With `apply_data` the previously active theme is backed up
//! (full export copied in place) before the target's data dump is
//! replayed and its media installed. A replay failure is reported but
//! leaves the synced templates in place, and media files that fail to copy
//! are reported without stopping the apply. Once templates are synced the
//! page cache is cleared, even when a later step fails.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use themesmith_core::apply::{ApplyProgress, ApplyState};
use themesmith_core::data_dump::DataDump;
use themesmith_core::error::CoreError;
use themesmith_core::theme::ExportOptions;
use themesmith_db::models::dump::ReplayReport;
use themesmith_db::repositories::ConfigRepo;

use crate::cache::CacheInvalidator;
use crate::dump::DataDumpCodec;
use crate::error::{ThemeError, ThemeResult};
use crate::media::{install_theme_media, theme_has_media, MediaInstallReport};
use crate::packager::{ExportMode, ThemePackager};
use crate::plugins::PluginRegistry;
use crate::settings::ThemeSettings;
use crate::store::{SyncReport, TemplateStore};

#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub theme: String,
    pub progress: ApplyProgress,
    pub sync: SyncReport,
    /// Theme snapshotted before data was replaced.
    pub backup: Option<String>,
    pub replay: Option<ReplayReport>,
    /// Why the data dump was not replayed, when it failed.
    pub data_error: Option<String>,
    pub media: Option<MediaInstallReport>,
}

pub struct ThemeApplier {
    pool: PgPool,
    settings: Arc<ThemeSettings>,
    cache: Arc<dyn CacheInvalidator>,
    plugins: PluginRegistry,
}

impl ThemeApplier {
    pub fn new(
        pool: PgPool,
        settings: Arc<ThemeSettings>,
        cache: Arc<dyn CacheInvalidator>,
        plugins: PluginRegistry,
    ) -> Self {
        Self {
            pool,
            settings,
            cache,
            plugins,
        }
    }

    pub async fn apply(&self, theme: &str, apply_data: bool) -> ThemeResult<ApplyReport> {
        let mut progress = ApplyProgress::new();
        match self.run(theme, apply_data, &mut progress).await {
            Ok(report) => Ok(report),
            Err(e) => {
                progress.fail();
                tracing::warn!(
                    theme = %theme,
                    state = %progress.state(),
                    error = %e,
                    "Theme apply failed",
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        theme: &str,
        apply_data: bool,
        progress: &mut ApplyProgress,
    ) -> ThemeResult<ApplyReport> {
        let theme_path = self.settings.theme_path(theme)?;
        if !tokio::fs::metadata(&theme_path).await.is_ok_and(|m| m.is_dir()) {
            return Err(CoreError::NotFound {
                entity: "theme",
                key: theme.to_string(),
            }
            .into());
        }
        let previous = ConfigRepo::current_theme(&self.pool).await?;

        // Templates
        let store =
            TemplateStore::new(self.pool.clone(), self.settings.clone(), self.cache.clone());
        let files = TemplateStore::list_template_files(&theme_path).await?;
        self.settings.protected.ensure_present(&files)?;
        if apply_data {
            if let Some(previous) = previous.as_deref() {
                self.packager().snapshot_template_types(previous).await?;
            }
        }
        store.clear_non_protected().await?;
        let sync = store.sync(theme).await?;
        progress.advance(ApplyState::TemplatesSynced)?;

        let mut report = ApplyReport {
            theme: theme.to_string(),
            progress: progress.clone(),
            sync,
            backup: None,
            replay: None,
            data_error: None,
            media: None,
        };

        let data = if apply_data {
            self.apply_data(&theme_path, previous.as_deref(), progress, &mut report)
                .await
        } else {
            Ok(())
        };

        self.cache.clean_all().await;
        data?;
        progress.advance(ApplyState::Applied)?;
        report.progress = progress.clone();

        tracing::info!(
            theme = %theme,
            with_data = report.replay.is_some(),
            with_media = report.media.is_some(),
            "Theme applied",
        );
        Ok(report)
    }

    async fn apply_data(
        &self,
        theme_path: &Path,
        previous: Option<&str>,
        progress: &mut ApplyProgress,
        report: &mut ApplyReport,
    ) -> ThemeResult<()> {
        // Parsed before the backup, which may write into this very theme.
        let dump: Option<DataDump> = match DataDumpCodec::read(theme_path).await {
            Ok(dump) => dump,
            Err(e @ ThemeError::Dump(_)) => {
                tracing::warn!(error = %e, "Skipping unreadable data dump");
                report.data_error = Some(e.to_string());
                None
            }
            Err(e) => return Err(e),
        };
        let has_media = theme_has_media(theme_path);
        if dump.is_none() && !has_media {
            return Ok(());
        }

        if let Some(previous) = previous {
            self.backup(previous).await?;
            report.backup = Some(previous.to_string());
        }

        if let Some(dump) = dump {
            let codec = DataDumpCodec::new(self.pool.clone(), self.plugins.clone());
            match codec.import(&dump).await {
                Ok(replay) => {
                    progress.advance(ApplyState::DataReplayed)?;
                    report.replay = Some(replay);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Data dump replay rolled back");
                    report.data_error = Some(e.to_string());
                }
            }
        }

        if has_media {
            let installed = install_theme_media(theme_path, &self.settings.website_root).await?;
            if !installed.failed.is_empty() {
                tracing::warn!(
                    failed = installed.failed.len(),
                    "Some theme media was not installed",
                );
            }
            progress.advance(ApplyState::MediaImported)?;
            report.media = Some(installed);
        }
        Ok(())
    }

    /// Full export of `theme` copied into its own directory.
    async fn backup(&self, theme: &str) -> ThemeResult<()> {
        self.packager()
            .export(theme, ExportOptions::full(), ExportMode::CopyInPlace)
            .await?;
        tracing::info!(theme = %theme, "Backed up active theme");
        Ok(())
    }

    fn packager(&self) -> ThemePackager {
        ThemePackager::new(self.pool.clone(), self.settings.clone(), self.plugins.clone())
    }
}
