//! Theme directories under the themes root: listing, upload, deletion.

use std::path::Path;
use std::sync::Arc;

use sqlx::PgPool;
use themesmith_core::error::CoreError;
use themesmith_core::theme::{
    is_preview_file, validate_theme_name, ThemeSummary, NO_PREVIEW_IMAGE, THEME_DATA_FILE,
};
use themesmith_db::repositories::ConfigRepo;

use crate::archive;
use crate::error::{ThemeError, ThemeResult};
use crate::media::theme_has_media;
use crate::settings::ThemeSettings;
use crate::store::TemplateStore;

pub const NO_THEMES_FOUND: &str = "No themes found";
pub const NO_VALID_THEMES: &str = "None of your themes are valid";

pub struct ThemeCatalog {
    pool: PgPool,
    settings: Arc<ThemeSettings>,
}

impl ThemeCatalog {
    pub fn new(pool: PgPool, settings: Arc<ThemeSettings>) -> Self {
        Self { pool, settings }
    }

    /// Valid themes, sorted by name.
    ///
    /// Directories missing a protected template are left out. Fails when
    /// there are no theme directories at all, or none of them is valid.
    pub async fn list(&self) -> ThemeResult<Vec<ThemeSummary>> {
        let root = self.settings.themes_root();
        let mut dirs = Vec::new();
        match tokio::fs::read_dir(&root).await {
            Ok(mut entries) => {
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| ThemeError::io(&root, e))?
                {
                    if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                        dirs.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ThemeError::io(&root, e)),
        }
        if dirs.is_empty() {
            return Err(ThemeError::NoThemes(NO_THEMES_FOUND));
        }
        dirs.sort();

        let current = ConfigRepo::current_theme(&self.pool).await?;
        let mut themes = Vec::new();
        for name in dirs {
            let path = root.join(&name);
            let files = TemplateStore::list_template_files(&path).await?;
            let missing = self.settings.protected.missing_from_listing(&files);
            if !missing.is_empty() {
                tracing::debug!(theme = %name, missing = ?missing, "Skipping invalid theme");
                continue;
            }
            themes.push(ThemeSummary {
                preview: self.preview_url(&name, &path).await,
                is_current: current.as_deref() == Some(name.as_str()),
                has_data: path.join(THEME_DATA_FILE).is_file() || theme_has_media(&path),
                name,
            });
        }

        if themes.is_empty() {
            return Err(ThemeError::NoThemes(NO_VALID_THEMES));
        }
        Ok(themes)
    }

    async fn preview_url(&self, name: &str, path: &Path) -> String {
        let Ok(mut entries) = tokio::fs::read_dir(path).await else {
            return self.no_preview_url();
        };
        let mut previews = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if is_preview_file(&file_name) {
                previews.push(file_name);
            }
        }
        previews.sort();
        match previews.first() {
            Some(file) => self.settings.theme_file_url(name, file),
            None => self.no_preview_url(),
        }
    }

    fn no_preview_url(&self) -> String {
        format!("{}{NO_PREVIEW_IMAGE}", self.settings.website_url)
    }

    /// Install an uploaded zip as theme `name`.
    ///
    /// The theme must not exist yet and must contain every protected
    /// template; otherwise nothing is left behind.
    pub async fn install(&self, name: &str, bytes: Vec<u8>) -> ThemeResult<Vec<String>> {
        validate_theme_name(name)?;
        let dest = self.settings.theme_path(name)?;
        if tokio::fs::metadata(&dest).await.is_ok() {
            return Err(CoreError::Conflict(format!("Theme '{name}' already exists")).into());
        }

        let target = dest.clone();
        let extracted =
            tokio::task::spawn_blocking(move || archive::extract(&bytes, &target)).await?;

        let validation = match extracted {
            Ok(files) => {
                let templates = TemplateStore::list_template_files(&dest).await?;
                self.settings
                    .protected
                    .ensure_present(&templates)
                    .map(|()| files)
                    .map_err(ThemeError::from)
            }
            Err(e) => Err(e),
        };

        match validation {
            Ok(files) => {
                tracing::info!(theme = %name, files = files.len(), "Theme installed");
                Ok(files)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&dest).await {
                    tracing::debug!(theme = %name, error = %cleanup, "Nothing to clean up");
                }
                Err(e)
            }
        }
    }

    /// Remove a theme directory. The current theme cannot be deleted.
    pub async fn delete(&self, name: &str) -> ThemeResult<()> {
        let path = self.settings.theme_path(name)?;
        if ConfigRepo::current_theme(&self.pool).await?.as_deref() == Some(name) {
            return Err(CoreError::Forbidden(format!(
                "Theme '{name}' is in use and cannot be deleted"
            ))
            .into());
        }
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::info!(theme = %name, "Theme deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CoreError::NotFound {
                entity: "theme",
                key: name.to_string(),
            }
            .into()),
            Err(e) => Err(ThemeError::io(&path, e)),
        }
    }
}
