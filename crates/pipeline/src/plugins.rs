//! Plugin export hooks.
//!
//! Plugins are compiled in and registered by name. Only hooks whose name
//! matches an enabled row of the `plugin` table take part in an export.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use themesmith_core::data_dump::PluginExport;
use themesmith_db::repositories::PluginRepo;

/// Capability a plugin exposes to contribute data to full theme exports.
#[async_trait]
pub trait ThemeExportHook: Send + Sync {
    /// Name matching the plugin's row in the `plugin` table.
    fn name(&self) -> &str;

    /// Extra pages, tables and media for the export. `None` contributes
    /// nothing.
    async fn export_website_data(
        &self,
        _pool: &PgPool,
    ) -> Result<Option<PluginExport>, sqlx::Error> {
        Ok(None)
    }
}

#[derive(Clone, Default)]
pub struct PluginRegistry {
    hooks: Vec<Arc<dyn ThemeExportHook>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn ThemeExportHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Registered hooks whose plugin is enabled, in registration order.
    pub async fn enabled_hooks(
        &self,
        pool: &PgPool,
    ) -> Result<Vec<Arc<dyn ThemeExportHook>>, sqlx::Error> {
        if self.hooks.is_empty() {
            return Ok(Vec::new());
        }
        let enabled = PluginRepo::list_enabled_names(pool).await?;
        Ok(self
            .hooks
            .iter()
            .filter(|hook| enabled.iter().any(|name| name == hook.name()))
            .cloned()
            .collect())
    }

    /// Run every enabled hook and collect what they contribute.
    pub async fn collect_exports(
        &self,
        pool: &PgPool,
    ) -> Result<Vec<(String, PluginExport)>, sqlx::Error> {
        let mut exports = Vec::new();
        for hook in self.enabled_hooks(pool).await? {
            if let Some(export) = hook.export_website_data(pool).await? {
                tracing::debug!(
                    plugin = %hook.name(),
                    pages = export.pages.len(),
                    tables = export.tables.len(),
                    media = export.media.len(),
                    "Plugin contributed export data",
                );
                exports.push((hook.name().to_string(), export));
            }
        }
        Ok(exports)
    }
}
