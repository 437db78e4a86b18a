use std::sync::Arc;

use themesmith_pipeline::applier::ThemeApplier;
use themesmith_pipeline::cache::{CacheInvalidator, PageCache};
use themesmith_pipeline::catalog::ThemeCatalog;
use themesmith_pipeline::packager::ThemePackager;
use themesmith_pipeline::plugins::PluginRegistry;
use themesmith_pipeline::store::TemplateStore;
use themesmith_pipeline::ThemeSettings;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: themesmith_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Website paths and limits handed to the theme pipeline.
    pub settings: Arc<ThemeSettings>,
    /// Rendered-page cache invalidated by template changes.
    pub cache: Arc<PageCache>,
    /// Compiled-in plugin export hooks.
    pub plugins: PluginRegistry,
}

impl AppState {
    pub fn new(pool: themesmith_db::DbPool, config: ServerConfig, plugins: PluginRegistry) -> Self {
        let settings = config.theme_settings();
        Self {
            pool,
            config: Arc::new(config),
            settings: Arc::new(settings),
            cache: Arc::new(PageCache::new()),
            plugins,
        }
    }

    fn invalidator(&self) -> Arc<dyn CacheInvalidator> {
        self.cache.clone()
    }

    pub fn template_store(&self) -> TemplateStore {
        TemplateStore::new(self.pool.clone(), self.settings.clone(), self.invalidator())
    }

    pub fn catalog(&self) -> ThemeCatalog {
        ThemeCatalog::new(self.pool.clone(), self.settings.clone())
    }

    pub fn packager(&self) -> ThemePackager {
        ThemePackager::new(self.pool.clone(), self.settings.clone(), self.plugins.clone())
    }

    pub fn applier(&self) -> ThemeApplier {
        ThemeApplier::new(
            self.pool.clone(),
            self.settings.clone(),
            self.invalidator(),
            self.plugins.clone(),
        )
    }
}
