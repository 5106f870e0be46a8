use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;
use serde::Deserialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageCacheConfig {
    pub max_bytes: usize,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    BudgetExceeded { requested: usize, max: usize },
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::BudgetExceeded { requested, max } => {
                write!(f, "image too large for budget: requested={requested} max={max}")
            }
        }
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug, Clone)]
struct CacheEntry {
    image: Arc<RgbaImage>,
    bytes: usize,
    last_used_tick: u64,
}

/// Decoded imagery keyed by URL, held under a byte budget.
///
/// Notes on determinism:
/// - Entries are keyed in a `BTreeMap` for stable traversal order.
/// - Eviction is LRU by `last_used_tick`, with a tie-break by URL ordering.
#[derive(Debug)]
pub struct ImageCache {
    config: ImageCacheConfig,
    used_bytes: usize,
    tick: u64,
    entries: BTreeMap<String, CacheEntry>,
}

impl ImageCache {
    pub fn new(config: ImageCacheConfig) -> Self {
        Self {
            config,
            used_bytes: 0,
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> ImageCacheConfig {
        self.config
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Returns the image and marks it most recently used.
    pub fn get(&mut self, url: &str) -> Option<Arc<RgbaImage>> {
        self.tick += 1;
        let entry = self.entries.get_mut(url)?;
        entry.last_used_tick = self.tick;
        Some(Arc::clone(&entry.image))
    }

    /// Inserts (or replaces) an image and evicts least recently used entries
    /// until the budget holds. Returns the evicted URLs in eviction order.
    pub fn insert(
        &mut self,
        url: impl Into<String>,
        image: Arc<RgbaImage>,
    ) -> Result<Vec<String>, CacheError> {
        let bytes = image.as_raw().len();
        if bytes > self.config.max_bytes {
            return Err(CacheError::BudgetExceeded {
                requested: bytes,
                max: self.config.max_bytes,
            });
        }

        self.tick += 1;
        let url = url.into();
        if let Some(old) = self.entries.insert(
            url.clone(),
            CacheEntry {
                image,
                bytes,
                last_used_tick: self.tick,
            },
        ) {
            self.used_bytes = self.used_bytes.saturating_sub(old.bytes);
        }
        self.used_bytes += bytes;

        Ok(self.evict_as_needed(&url))
    }

    pub fn remove(&mut self, url: &str) -> bool {
        match self.entries.remove(url) {
            Some(e) => {
                self.used_bytes = self.used_bytes.saturating_sub(e.bytes);
                true
            }
            None => false,
        }
    }

    fn evict_as_needed(&mut self, protected: &str) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.used_bytes > self.config.max_bytes {
            let candidate = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != protected)
                .min_by(|(ka, ea), (kb, eb)| {
                    ea.last_used_tick
                        .cmp(&eb.last_used_tick)
                        .then_with(|| ka.cmp(kb))
                })
                .map(|(k, _)| k.clone());

            let Some(url) = candidate else {
                break;
            };
            self.remove(&url);
            evicted.push(url);
        }
        evicted
    }
}
