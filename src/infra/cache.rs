//! Process-lifetime cache for the downloaded item dump.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::AlbionItem;

/// Explicitly owned item-catalog cache.
///
/// Cloning shares the same slot. A stored catalog never expires; only
/// [`ItemCatalogCache::clear`] drops it. Empty catalogs are never stored so a
/// failed download is retried on the next lookup.
#[derive(Clone, Default)]
pub struct ItemCatalogCache {
    items: Arc<Mutex<Option<Vec<AlbionItem>>>>,
}

impl ItemCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Vec<AlbionItem>> {
        let cache = self.items.lock().await;
        cache.clone()
    }

    /// Stores `items` unless the list is empty. Returns whether it was kept.
    pub async fn store(&self, items: Vec<AlbionItem>) -> bool {
        if items.is_empty() {
            debug!("[item-cache] Refusing to cache an empty catalog");
            return false;
        }
        debug!("[item-cache] Caching {} items", items.len());
        *self.items.lock().await = Some(items);
        true
    }

    pub async fn is_populated(&self) -> bool {
        self.items.lock().await.is_some()
    }

    pub async fn clear(&self) {
        self.items.lock().await.take();
    }
}
