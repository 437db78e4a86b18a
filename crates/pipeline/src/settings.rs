//! Paths and limits the pipeline runs with.

use std::path::PathBuf;

use themesmith_core::error::CoreError;
use themesmith_core::media::MAX_THEME_MEDIA_BYTES;
use themesmith_core::template::ProtectedTemplates;
use themesmith_core::theme::validate_theme_name;

/// Default themes folder, relative to the website root.
pub const DEFAULT_THEMES_DIR: &str = "themes";

#[derive(Debug, Clone)]
pub struct ThemeSettings {
    /// Website root on disk. Live `media/` and `previews/` live here.
    pub website_root: PathBuf,
    /// Public base URL of the website, with a trailing slash.
    pub website_url: String,
    /// Themes folder, relative to `website_root`.
    pub themes_dir: String,
    /// Ceiling on the media bundled with one export.
    pub max_media_bytes: u64,
    pub protected: ProtectedTemplates,
    /// Where export archives are staged before download.
    pub archive_dir: PathBuf,
}

impl ThemeSettings {
    pub fn new(website_root: impl Into<PathBuf>) -> Self {
        Self {
            website_root: website_root.into(),
            website_url: "http://localhost:3000/".to_string(),
            themes_dir: DEFAULT_THEMES_DIR.to_string(),
            max_media_bytes: MAX_THEME_MEDIA_BYTES,
            protected: ProtectedTemplates::default(),
            archive_dir: std::env::temp_dir().join("themesmith"),
        }
    }

    pub fn themes_root(&self) -> PathBuf {
        self.website_root.join(&self.themes_dir)
    }

    /// Directory of the named theme. The name is validated first so it can
    /// never address anything outside the themes root.
    pub fn theme_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        validate_theme_name(name)?;
        Ok(self.themes_root().join(name))
    }

    /// Absolute URL of a file inside a theme.
    pub fn theme_file_url(&self, theme: &str, file: &str) -> String {
        format!("{}{}/{theme}/{file}", self.website_url, self.themes_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_paths_stay_under_root() {
        let settings = ThemeSettings::new("/srv/site");
        assert_eq!(
            settings.theme_path("business").unwrap(),
            PathBuf::from("/srv/site/themes/business")
        );
        assert!(settings.theme_path("../etc").is_err());
        assert_eq!(
            settings.theme_file_url("business", "preview.png"),
            "http://localhost:3000/themes/business/preview.png"
        );
    }
}
