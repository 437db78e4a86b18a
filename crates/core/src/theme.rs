//! Theme directory layout, export options and listing types.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Structured data dump shipped with a full theme.
pub const THEME_DATA_FILE: &str = "theme.json";

/// Legacy sidecar mapping template names to types.
pub const THEME_CONFIG_FILE: &str = "theme.ini";

/// Theme subfolder with media images (`media/<folder>/<file>`).
pub const THEME_MEDIA_DIR: &str = "media";

/// Theme subfolder with page teaser images (`previews/<file>`).
pub const THEME_PREVIEWS_DIR: &str = "previews";

/// Canonical resolution variant of a media image on the live site.
pub const ORIGINAL_VARIANT: &str = "original";

/// Extensions accepted for a theme's own `preview.*` thumbnail.
pub const PREVIEW_EXTENSIONS: &[&str] = &["png", "jpg", "gif"];

/// Fallback thumbnail for themes without a preview, relative to the site URL.
pub const NO_PREVIEW_IMAGE: &str = "system/images/noimage.png";

/// Maximum length of a theme directory name.
pub const THEME_NAME_MAX_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Validate a theme directory name.
///
/// Theme names become path components under the themes root, so only
/// ASCII alphanumerics, `-`, `_` and `.` are allowed, and the name may not
/// start with a dot.
pub fn validate_theme_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation("Theme name must not be empty".into()));
    }
    if name.len() > THEME_NAME_MAX_LEN {
        return Err(CoreError::Validation(format!(
            "Theme name must be at most {THEME_NAME_MAX_LEN} characters"
        )));
    }
    if name.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "Invalid theme name '{name}'"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(CoreError::Validation(format!(
            "Theme name '{name}' contains invalid characters"
        )));
    }
    Ok(())
}

/// Whether `file_name` is a theme thumbnail (`preview.png|jpg|gif`).
pub fn is_preview_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower
        .strip_prefix("preview.")
        .is_some_and(|ext| PREVIEW_EXTENSIONS.contains(&ext))
}

// ---------------------------------------------------------------------------
// Export options
// ---------------------------------------------------------------------------

/// What an export carries besides templates and styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    /// Templates, styles and the theme's own files only.
    #[default]
    Light,
    /// Also the data dump and referenced media.
    Full,
}

/// Export toggles. `sql`, `media` and `teasers` only matter for full exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub kind: ThemeKind,
    pub sql: bool,
    pub media: bool,
    pub teasers: bool,
}

impl ExportOptions {
    pub fn light() -> Self {
        Self {
            kind: ThemeKind::Light,
            sql: false,
            media: false,
            teasers: false,
        }
    }

    pub fn full() -> Self {
        Self {
            kind: ThemeKind::Full,
            sql: true,
            media: true,
            teasers: true,
        }
    }

    pub fn is_full(&self) -> bool {
        self.kind == ThemeKind::Full
    }

    pub fn includes_data(&self) -> bool {
        self.is_full() && self.sql
    }

    pub fn includes_media(&self) -> bool {
        self.is_full() && self.media
    }

    pub fn includes_teasers(&self) -> bool {
        self.is_full() && self.teasers
    }

    /// Theme-relative paths to leave out of the archive.
    ///
    /// Directory entries exclude everything beneath them.
    pub fn excluded_paths(&self) -> Vec<String> {
        let mut excluded = Vec::new();
        if !self.includes_data() {
            excluded.push(THEME_DATA_FILE.to_string());
        }
        if self.is_full() && !self.media {
            excluded.push(format!("{THEME_MEDIA_DIR}/"));
        }
        if self.is_full() && !self.teasers {
            excluded.push(format!("{THEME_PREVIEWS_DIR}/"));
        }
        excluded
    }

    /// Keep only media paths this export is allowed to carry.
    pub fn accepts_media_path(&self, path: &str) -> bool {
        match path.split('/').next() {
            Some(THEME_MEDIA_DIR) => self.includes_media(),
            Some(THEME_PREVIEWS_DIR) => self.includes_teasers(),
            _ => false,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::light()
    }
}

/// Whether `relative_path` matches an exclusion entry.
pub fn is_excluded(relative_path: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|entry| match entry.strip_suffix('/') {
        Some(dir) => relative_path == dir || relative_path.starts_with(entry.as_str()),
        None => relative_path == entry,
    })
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One entry of the theme list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub name: String,
    /// Absolute URL of the theme thumbnail or the no-image fallback.
    pub preview: String,
    pub is_current: bool,
    /// The theme ships a data dump or media folders.
    pub has_data: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
