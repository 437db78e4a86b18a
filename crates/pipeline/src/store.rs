//! Template Store: keeps the `template` table in step with theme files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use themesmith_core::error::CoreError;
use themesmith_core::template::{
    assign_type, cache_tag, derive_template_name, plan_rename, validate_template_name,
    RenameDecision, TemplateType, TemplateTypeMap, MOBILE_DIR, TEMPLATE_EXTENSION,
};
use themesmith_core::theme::THEME_CONFIG_FILE;
use themesmith_db::models::template::{CreateTemplate, Template, UpdateTemplate};
use themesmith_db::repositories::{ConfigRepo, TemplateRepo};

use crate::cache::CacheInvalidator;
use crate::error::{ThemeError, ThemeResult};
use crate::settings::ThemeSettings;

/// Outcome of a successful sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub theme: String,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Files whose derived name is not a valid template name.
    pub ignored: Vec<String>,
}

/// Request to create or update one template.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveTemplate {
    pub name: String,
    pub content: String,
    #[serde(default, rename = "type")]
    pub template_type: TemplateType,
    /// Name of the template being edited; absent when creating.
    #[serde(default)]
    pub original_name: Option<String>,
}

#[derive(Clone)]
pub struct TemplateStore {
    pool: PgPool,
    settings: Arc<ThemeSettings>,
    cache: Arc<dyn CacheInvalidator>,
}

impl TemplateStore {
    pub fn new(
        pool: PgPool,
        settings: Arc<ThemeSettings>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            pool,
            settings,
            cache,
        }
    }

    // -----------------------------------------------------------------------
    // Theme files
    // -----------------------------------------------------------------------

    /// `*.html` files at the theme root, then under `mobile/`, each group
    /// sorted. Paths are relative and `/`-separated.
    pub async fn list_template_files(theme_path: &Path) -> ThemeResult<Vec<String>> {
        let mut files = html_files(theme_path, None).await?;
        files.extend(html_files(&theme_path.join(MOBILE_DIR), Some(MOBILE_DIR)).await?);
        Ok(files)
    }

    /// The theme's legacy `theme.ini` type map, if it has a readable one.
    pub async fn read_type_map(theme_path: &Path) -> Option<TemplateTypeMap> {
        let path = theme_path.join(THEME_CONFIG_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(TemplateTypeMap::parse(&text)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No template type map");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    /// Mirror the theme's template files into the store.
    ///
    /// Missing protected templates fail the sync before anything is
    /// written. Unreadable files are collected and reported together after
    /// the remaining files were processed. Only a sync without errors
    /// records the theme as current.
    pub async fn sync(&self, theme: &str) -> ThemeResult<SyncReport> {
        let theme_path = self.existing_theme_path(theme).await?;
        let files = Self::list_template_files(&theme_path).await?;
        self.settings.protected.ensure_present(&files)?;

        let type_map = Self::read_type_map(&theme_path).await;
        let mut report = SyncReport {
            theme: theme.to_string(),
            ..SyncReport::default()
        };
        let mut errors = Vec::new();
        let mut tags = Vec::new();

        for file in &files {
            let name = derive_template_name(file);
            if let Err(e) = validate_template_name(&name) {
                tracing::warn!(file = %file, error = %e, "Ignoring template file");
                report.ignored.push(file.clone());
                continue;
            }
            let template_type = assign_type(&name, file, type_map.as_ref());

            let path = theme_path.join(file);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "Unable to read template file",
                    );
                    errors.push(format!("Unable to read template file: {file}"));
                    continue;
                }
            };

            let update = UpdateTemplate {
                name: None,
                content: Some(content),
                template_type,
            };
            match TemplateRepo::update_by_name(&self.pool, &name, &update).await? {
                Some(_) => report.updated.push(name.clone()),
                None => {
                    let create = CreateTemplate {
                        name: name.clone(),
                        content: update.content.unwrap_or_default(),
                        template_type: template_type.unwrap_or_default(),
                    };
                    TemplateRepo::create(&self.pool, &create).await?;
                    report.created.push(name.clone());
                }
            }
            tags.push(cache_tag(&name));
        }

        self.cache.clean_tags(&tags).await;

        if !errors.is_empty() {
            return Err(CoreError::InvalidTheme(errors).into());
        }

        ConfigRepo::set_current_theme(&self.pool, theme).await?;
        tracing::info!(
            theme = %theme,
            created = report.created.len(),
            updated = report.updated.len(),
            "Templates synced",
        );
        Ok(report)
    }

    /// Delete every template that is not protected.
    pub async fn clear_non_protected(&self) -> ThemeResult<u64> {
        let removed =
            TemplateRepo::delete_except(&self.pool, self.settings.protected.names()).await?;
        tracing::debug!(removed, "Cleared non-protected templates");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Single-template edits
    // -----------------------------------------------------------------------

    /// Create a template, or update the one named `original_name`.
    ///
    /// A protected template keeps its name when a rename is requested.
    /// The template's file in the current theme is rewritten.
    pub async fn save_template(&self, input: &SaveTemplate) -> ThemeResult<Template> {
        if input.content.trim().is_empty() {
            return Err(CoreError::Validation("Template content can't be empty.".into()).into());
        }

        let saved = match &input.original_name {
            Some(original) => self.update_template(original, input).await?,
            None => self.create_template(input).await?,
        };

        self.write_template_file(&saved).await?;
        if let Some(original) = input.original_name.as_deref() {
            if original != saved.name {
                self.remove_template_file(original).await?;
            }
            self.cache.clean_tags(&[cache_tag(original)]).await;
        }
        self.cache.clean_tags(&[cache_tag(&saved.name)]).await;

        tracing::info!(template = %saved.name, "Template saved");
        Ok(saved)
    }

    async fn create_template(&self, input: &SaveTemplate) -> ThemeResult<Template> {
        validate_template_name(&input.name)?;
        if self.settings.protected.contains(&input.name)
            || TemplateRepo::find_by_name(&self.pool, &input.name).await?.is_some()
        {
            return Err(CoreError::Conflict(format!("Template '{}' exists", input.name)).into());
        }
        let create = CreateTemplate {
            name: input.name.clone(),
            content: input.content.clone(),
            template_type: input.template_type,
        };
        Ok(TemplateRepo::create(&self.pool, &create).await?)
    }

    async fn update_template(&self, original: &str, input: &SaveTemplate) -> ThemeResult<Template> {
        if TemplateRepo::find_by_name(&self.pool, original).await?.is_none() {
            return Err(not_found(original));
        }

        let new_name = match plan_rename(original, &input.name, &self.settings.protected)? {
            RenameDecision::Unchanged => None,
            RenameDecision::Refused => {
                tracing::debug!(template = %original, "Protected template keeps its name");
                None
            }
            RenameDecision::Rename { new_name, .. } => {
                if TemplateRepo::find_by_name(&self.pool, &new_name).await?.is_some() {
                    return Err(CoreError::Conflict(format!("Template '{new_name}' exists")).into());
                }
                Some(new_name)
            }
        };

        let update = UpdateTemplate {
            name: new_name,
            content: Some(input.content.clone()),
            template_type: Some(input.template_type),
        };
        TemplateRepo::update_by_name(&self.pool, original, &update)
            .await?
            .ok_or_else(|| not_found(original))
    }

    /// Delete a non-protected template and its file in the current theme.
    pub async fn delete_template(&self, name: &str) -> ThemeResult<()> {
        if self.settings.protected.contains(name) {
            return Err(CoreError::Forbidden(format!("Template '{name}' is protected")).into());
        }
        if !TemplateRepo::delete_by_name(&self.pool, name).await? {
            return Err(not_found(name));
        }
        self.remove_template_file(name).await?;
        self.cache.clean_tags(&[cache_tag(name)]).await;
        tracing::info!(template = %name, "Template deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn existing_theme_path(&self, theme: &str) -> ThemeResult<PathBuf> {
        let path = self.settings.theme_path(theme)?;
        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            return Err(CoreError::NotFound {
                entity: "theme",
                key: theme.to_string(),
            }
            .into());
        }
        Ok(path)
    }

    /// File of `name` inside the current theme, if a theme is current.
    async fn current_theme_file(&self, name: &str, mobile: bool) -> ThemeResult<Option<PathBuf>> {
        let Some(theme) = ConfigRepo::current_theme(&self.pool).await? else {
            return Ok(None);
        };
        let theme_path = self.settings.theme_path(&theme)?;
        Ok(Some(theme_path.join(template_file(name, mobile))))
    }

    async fn write_template_file(&self, template: &Template) -> ThemeResult<()> {
        let mobile = template.kind() == TemplateType::Mobile;
        let Some(path) = self.current_theme_file(&template.name, mobile).await? else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ThemeError::io(parent, e))?;
        }
        tokio::fs::write(&path, &template.content)
            .await
            .map_err(|e| ThemeError::io(&path, e))
    }

    async fn remove_template_file(&self, name: &str) -> ThemeResult<()> {
        for mobile in [false, true] {
            let Some(path) = self.current_theme_file(name, mobile).await? else {
                return Ok(());
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ThemeError::io(&path, e)),
            }
        }
        Ok(())
    }
}

/// Theme-relative file of a template: `mobile_x` of mobile type lives at
/// `mobile/x.html`, everything else at `<name>.html`.
fn template_file(name: &str, mobile: bool) -> String {
    let mobile_prefix = format!("{MOBILE_DIR}_");
    match name.strip_prefix(&mobile_prefix) {
        Some(rest) if mobile => format!("{MOBILE_DIR}/{rest}.{TEMPLATE_EXTENSION}"),
        _ => format!("{name}.{TEMPLATE_EXTENSION}"),
    }
}

fn not_found(name: &str) -> ThemeError {
    CoreError::NotFound {
        entity: "template",
        key: name.to_string(),
    }
    .into()
}

/// Sorted `*.html` file names directly inside `dir`, optionally prefixed.
async fn html_files(dir: &Path, prefix: Option<&str>) -> ThemeResult<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ThemeError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ThemeError::io(dir, e))?
    {
        let path = entry.path();
        let is_html = path
            .extension()
            .is_some_and(|ext| ext == TEMPLATE_EXTENSION);
        if !is_html || !entry.file_type().await.is_ok_and(|t| t.is_file()) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        files.push(match prefix {
            Some(prefix) => format!("{prefix}/{file_name}"),
            None => file_name,
        });
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn template_file_layout() {
        assert_eq!(template_file("index", false), "index.html");
        assert_eq!(template_file("mobile_index", true), "mobile/index.html");
        assert_eq!(template_file("mobile_index", false), "mobile_index.html");
        assert_eq!(template_file("landing", true), "landing.html");
    }

    #[tokio::test]
    async fn lists_root_then_mobile_html() {
        let tmp = tempfile::tempdir().unwrap();
        for file in ["news.html", "index.html", "style.css", "mobile/index.html", "css/x.html"] {
            let path = tmp.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        fs::create_dir_all(tmp.path().join("dir.html")).unwrap();

        let files = TemplateStore::list_template_files(tmp.path()).await.unwrap();
        assert_eq!(files, vec!["index.html", "news.html", "mobile/index.html"]);
    }

    #[tokio::test]
    async fn missing_type_map_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(TemplateStore::read_type_map(tmp.path()).await.is_none());

        fs::write(tmp.path().join(THEME_CONFIG_FILE), "index = \"typemobile\"\n").unwrap();
        let map = TemplateStore::read_type_map(tmp.path()).await.unwrap();
        assert_eq!(map.get("index"), Some("typemobile"));
    }
}
