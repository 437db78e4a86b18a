use std::path::PathBuf;

use themesmith_core::media::MAX_THEME_MEDIA_BYTES;
use themesmith_core::template::{ProtectedTemplates, DEFAULT_PROTECTED_TEMPLATES};
use themesmith_pipeline::settings::DEFAULT_THEMES_DIR;
use themesmith_pipeline::ThemeSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// Website root on disk; themes and live media live below it.
    pub website_path: PathBuf,
    /// Public URL of the website, with a trailing slash.
    pub website_url: String,
    /// Themes folder, relative to the website root.
    pub themes_dir: String,
    /// Ceiling on media bundled with a full export.
    pub max_media_bytes: u64,
    /// Templates every theme must ship and that cannot be renamed or deleted.
    pub protected_templates: Vec<String>,
    /// Where export archives are staged before download.
    pub archive_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `HOST`                  | `0.0.0.0`                        |
    /// | `PORT`                  | `3000`                           |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS`  | `120`                            |
    /// | `WEBSITE_PATH`          | `./website`                      |
    /// | `WEBSITE_URL`           | `http://localhost:3000/`         |
    /// | `THEMES_DIR`            | `themes`                         |
    /// | `THEME_MAX_MEDIA_BYTES` | `31457280`                       |
    /// | `PROTECTED_TEMPLATES`   | `index,default,category,news`    |
    /// | `ARCHIVE_TMP_DIR`       | `<os temp dir>/themesmith`       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let website_path = PathBuf::from(
            std::env::var("WEBSITE_PATH").unwrap_or_else(|_| "./website".into()),
        );

        let mut website_url =
            std::env::var("WEBSITE_URL").unwrap_or_else(|_| "http://localhost:3000/".into());
        if !website_url.ends_with('/') {
            website_url.push('/');
        }

        let themes_dir = std::env::var("THEMES_DIR").unwrap_or_else(|_| DEFAULT_THEMES_DIR.into());

        let max_media_bytes: u64 = std::env::var("THEME_MAX_MEDIA_BYTES")
            .map(|v| v.parse().expect("THEME_MAX_MEDIA_BYTES must be a valid u64"))
            .unwrap_or(MAX_THEME_MEDIA_BYTES);

        let protected_templates = match std::env::var("PROTECTED_TEMPLATES") {
            Ok(list) => split_list(&list),
            Err(_) => DEFAULT_PROTECTED_TEMPLATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let archive_dir = std::env::var("ARCHIVE_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("themesmith"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            website_path,
            website_url,
            themes_dir,
            max_media_bytes,
            protected_templates,
            archive_dir,
        }
    }

    /// Pipeline settings derived from this configuration.
    pub fn theme_settings(&self) -> ThemeSettings {
        ThemeSettings {
            website_root: self.website_path.clone(),
            website_url: self.website_url.clone(),
            themes_dir: self.themes_dir.clone(),
            max_media_bytes: self.max_media_bytes,
            protected: ProtectedTemplates::new(self.protected_templates.iter()),
            archive_dir: self.archive_dir.clone(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
