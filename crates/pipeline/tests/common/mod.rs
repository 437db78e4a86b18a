//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use themesmith_pipeline::cache::PageCache;
use themesmith_pipeline::ThemeSettings;

pub const PROTECTED: [&str; 4] = ["index", "default", "category", "news"];

/// A throwaway website root with a themes folder and an archive folder.
pub struct Site {
    pub dir: TempDir,
    pub settings: Arc<ThemeSettings>,
    pub cache: Arc<PageCache>,
}

impl Site {
    pub fn new() -> Self {
        Self::with_media_limit(themesmith_core::media::MAX_THEME_MEDIA_BYTES)
    }

    pub fn with_media_limit(max_media_bytes: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = ThemeSettings::new(dir.path().join("site"));
        settings.archive_dir = dir.path().join("archives");
        settings.website_url = "http://example.test/".to_string();
        settings.max_media_bytes = max_media_bytes;
        fs::create_dir_all(settings.themes_root()).unwrap();
        Self {
            dir,
            settings: Arc::new(settings),
            cache: Arc::new(PageCache::new()),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.settings.website_root.clone()
    }

    pub fn theme_path(&self, name: &str) -> PathBuf {
        self.settings.themes_root().join(name)
    }

    /// Write files into a theme directory.
    pub fn write_theme(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = self.theme_path(name);
        fs::create_dir_all(&path).unwrap();
        for (file, contents) in files {
            write_file(&path.join(file), contents.as_bytes());
        }
        path
    }

    /// A theme with every protected template plus `extra` files.
    pub fn valid_theme(&self, name: &str, extra: &[(&str, &str)]) -> PathBuf {
        let mut files: Vec<(String, String)> = PROTECTED
            .iter()
            .map(|t| (format!("{t}.html"), format!("<{name}:{t}>")))
            .collect();
        files.extend(extra.iter().map(|(f, c)| (f.to_string(), c.to_string())));
        let borrowed: Vec<(&str, &str)> = files
            .iter()
            .map(|(f, c)| (f.as_str(), c.as_str()))
            .collect();
        self.write_theme(name, &borrowed)
    }

    /// Write a file below the website root.
    pub fn write_live(&self, rel: &str, bytes: &[u8]) {
        write_file(&self.root().join(rel), bytes);
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}
