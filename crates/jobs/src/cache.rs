//! Time-boxed cache of generated image URLs.
//!
//! Keys are `(normalized prompt, model)`. Entries older than the TTL are
//! treated as misses but left in place; the next successful generation for
//! the same key overwrites them.

use std::collections::HashMap;
use std::time::Duration;

use kidstory_core::prompt;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    prompt: String,
    model: String,
}

impl CacheKey {
    fn new(prompt: &str, model: &str) -> Self {
        Self {
            prompt: prompt::normalize(prompt),
            model: model.trim().to_lowercase(),
        }
    }
}

struct CacheEntry {
    url: String,
    created_at: Instant,
}

pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached URL for `(prompt, model)` if it is younger than the TTL.
    pub async fn lookup(&self, prompt: &str, model: &str) -> Option<String> {
        let key = CacheKey::new(prompt, model);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;

        if entry.created_at.elapsed() < self.ttl {
            Some(entry.url.clone())
        } else {
            None
        }
    }

    /// Insert or overwrite the entry for `(prompt, model)`, stamped now.
    pub async fn store(&self, prompt: &str, model: &str, url: impl Into<String>) {
        let key = CacheKey::new(prompt, model);
        self.entries.write().await.insert(
            key,
            CacheEntry {
                url: url.into(),
                created_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, including stale ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
