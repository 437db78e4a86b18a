//! Media resolution against the live website tree, and installation of a
//! theme's bundled media.

use std::path::{Path, PathBuf};

use serde::Serialize;
use themesmith_core::media::{collect_candidates, live_destination, MediaFile, MediaSet};
use themesmith_core::theme::{THEME_MEDIA_DIR, THEME_PREVIEWS_DIR};
use themesmith_core::types::Row;

use crate::error::ThemeResult;
use crate::files::{copy_file, list_files};
use crate::settings::ThemeSettings;

pub struct MediaResolver {
    website_root: PathBuf,
    max_bytes: u64,
}

impl MediaResolver {
    pub fn new(settings: &ThemeSettings) -> Self {
        Self {
            website_root: settings.website_root.clone(),
            max_bytes: settings.max_media_bytes,
        }
    }

    /// Media referenced by `pages`, `containers` and plugin `extra` paths
    /// that exists under the website root.
    ///
    /// Fails when `pages` is empty or the set exceeds the size ceiling;
    /// a partial set is never returned.
    pub async fn resolve(
        &self,
        pages: &[Row],
        containers: &[Row],
        extra: &[String],
    ) -> ThemeResult<MediaSet> {
        let candidates = collect_candidates(pages, containers, extra)?;
        self.measure(candidates).await
    }

    /// Keep the candidates that exist as files, sum their sizes and enforce
    /// the ceiling.
    pub async fn measure(&self, candidates: Vec<String>) -> ThemeResult<MediaSet> {
        let mut set = MediaSet::default();
        for path in candidates {
            let full = self.website_root.join(&path);
            match tokio::fs::metadata(&full).await {
                Ok(meta) if meta.is_file() => set.push(MediaFile {
                    path,
                    size_bytes: meta.len(),
                }),
                Ok(_) => tracing::debug!(path = %path, "Media reference is not a file"),
                Err(e) => tracing::debug!(path = %path, error = %e, "Dropping missing media file"),
            }
        }
        set.ensure_within(self.max_bytes)?;
        Ok(set)
    }

    pub fn source_path(&self, file: &MediaFile) -> PathBuf {
        self.website_root.join(&file.path)
    }
}

/// Result of copying a theme's media into the live site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaInstallReport {
    pub copied: Vec<String>,
    /// Theme files that do not follow the `media/<folder>/<file>` layout.
    pub skipped: Vec<String>,
    /// Live destinations that could not be written.
    pub failed: Vec<String>,
}

/// Whether the theme ships a `media/` or `previews/` folder.
pub fn theme_has_media(theme_path: &Path) -> bool {
    theme_path.join(THEME_MEDIA_DIR).is_dir() || theme_path.join(THEME_PREVIEWS_DIR).is_dir()
}

/// Copy a theme's `media/` and `previews/` into the live website tree.
///
/// `media/<folder>/<file>` lands in `media/<folder>/original/<file>`;
/// destination folders are created as needed. A file that cannot be copied
/// is logged and recorded in `failed`; the rest are still installed.
pub async fn install_theme_media(
    theme_path: &Path,
    website_root: &Path,
) -> ThemeResult<MediaInstallReport> {
    let theme_path = theme_path.to_path_buf();
    let website_root = website_root.to_path_buf();
    tokio::task::spawn_blocking(move || install_blocking(&theme_path, &website_root)).await?
}

fn install_blocking(theme_path: &Path, website_root: &Path) -> ThemeResult<MediaInstallReport> {
    let mut report = MediaInstallReport::default();
    for dir in [THEME_MEDIA_DIR, THEME_PREVIEWS_DIR] {
        for rel in list_files(&theme_path.join(dir))? {
            let theme_rel = format!("{dir}/{rel}");
            let Some(dest) = live_destination(&theme_rel) else {
                report.skipped.push(theme_rel);
                continue;
            };
            let source = theme_path.join(&theme_rel);
            if !source.is_file() {
                continue;
            }
            match copy_file(&source, &website_root.join(&dest)) {
                Ok(_) => report.copied.push(dest),
                Err(e) => {
                    tracing::warn!(file = %dest, error = %e, "Unable to install theme media");
                    report.failed.push(dest);
                }
            }
        }
    }
    Ok(report)
}
