//! In-memory data cache
//!
//! Holds thumbnail and preview bytes keyed by URL. Bounded both by entry
//! count and by total size; the least recently used entry goes first.

use crate::config::CacheConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    data: Arc<Vec<u8>>,
    last_used: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    total_cost: usize,
    clock: u64,
}

impl Inner {
    fn touch(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.total_cost -= entry.data.len();
        Some(entry)
    }

    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                tracing::trace!("Evicting cached {}", key);
                self.remove(&key).is_some()
            }
            None => false,
        }
    }
}

pub struct VideoCache {
    count_limit: usize,
    total_cost_limit: usize,
    inner: Mutex<Inner>,
}

impl VideoCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            count_limit: config.count_limit,
            total_cost_limit: config.total_cost_limit,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Store `data` under `key`, evicting older entries to stay in bounds.
    /// Returns false if the item alone exceeds the size limit.
    pub fn insert(&self, key: impl Into<String>, data: Vec<u8>) -> bool {
        let key = key.into();
        if data.len() > self.total_cost_limit || self.count_limit == 0 {
            tracing::debug!("Not caching {}: {} bytes over limit", key, data.len());
            return false;
        }

        let mut inner = self.inner.lock();
        inner.remove(&key);
        while inner.entries.len() >= self.count_limit
            || inner.total_cost + data.len() > self.total_cost_limit
        {
            if !inner.evict_oldest() {
                break;
            }
        }

        let last_used = inner.touch();
        inner.total_cost += data.len();
        inner.entries.insert(
            key,
            Entry {
                data: Arc::new(data),
                last_used,
            },
        );
        true
    }

    /// Look up `key`, marking it recently used
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock();
        let now = inner.touch();
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry.data.clone())
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Drop everything, e.g. under memory pressure
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_cost = 0;
        tracing::debug!("Video cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held
    pub fn total_cost(&self) -> usize {
        self.inner.lock().total_cost
    }
}
