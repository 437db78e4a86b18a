//! Rendered-page cache and its invalidation interface.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Clears cached output after templates or content change.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Drop every cached entry.
    async fn clean_all(&self);

    /// Drop entries carrying any of `tags`.
    async fn clean_tags(&self, tags: &[String]);
}

struct CacheEntry {
    value: String,
    tags: Vec<String>,
}

/// In-process cache of rendered output, keyed by page and tagged by the
/// templates that produced it.
pub struct PageCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>, tags: Vec<String>) {
        let entry = CacheEntry {
            value: value.into(),
            tags,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheInvalidator for PageCache {
    async fn clean_all(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        tracing::debug!(count, "Page cache cleared");
    }

    async fn clean_tags(&self, tags: &[String]) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(t)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_by_tag_keeps_other_entries() {
        let cache = PageCache::new();
        cache.put("index.html", "<home>", vec!["index".into()]).await;
        cache.put("news.html", "<news>", vec!["news".into(), "default".into()]).await;
        cache.put("about.html", "<about>", vec!["default".into()]).await;

        cache.clean_tags(&["default".to_string()]).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("index.html").await.as_deref(), Some("<home>"));

        cache.clean_all().await;
        assert!(cache.is_empty().await);
    }
}
