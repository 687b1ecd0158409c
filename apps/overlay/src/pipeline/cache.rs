//! Byte-budgeted read cache for source files.
//!
//! Owned by the session and shared through `Arc`. Eviction is FIFO by insertion
//! order: the oldest entries are dropped until a new entry fits. An entry larger
//! than the whole budget is handed back to the caller but never stored.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use tracing::debug;

use crate::errors::OverlayError;

pub const DEFAULT_CACHE_BUDGET_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<PathBuf, Bytes>,
    order: VecDeque<PathBuf>,
    total_bytes: usize,
}

impl CacheInner {
    fn remove(&mut self, path: &Path) {
        if let Some(old) = self.entries.remove(path) {
            self.total_bytes -= old.len();
            self.order.retain(|p| p != path);
        }
    }
}

#[derive(Debug)]
pub struct ReadCache {
    budget: usize,
    inner: Mutex<CacheInner>,
}

impl ReadCache {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Poisoning is ignored: no method panics between updates of the maps.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, path: &Path) -> Option<Bytes> {
        self.lock().entries.get(path).cloned()
    }

    /// Stores `bytes` under `path`, evicting oldest entries as needed.
    /// Returns `false` when the entry exceeds the budget and was not stored.
    pub fn insert(&self, path: PathBuf, bytes: Bytes) -> bool {
        if bytes.len() > self.budget {
            debug!(path = %path.display(), size = bytes.len(), "Entry exceeds cache budget, not cached");
            return false;
        }

        let mut inner = self.lock();
        inner.remove(&path);
        while inner.total_bytes + bytes.len() > self.budget {
            let Some(oldest) = inner.order.pop_front() else { break };
            if let Some(evicted) = inner.entries.remove(&oldest) {
                inner.total_bytes -= evicted.len();
                debug!(path = %oldest.display(), size = evicted.len(), "Evicted cache entry");
            }
        }
        inner.total_bytes += bytes.len();
        inner.order.push_back(path.clone());
        inner.entries.insert(path, bytes);
        true
    }

    /// Returns the cached bytes for `path`, reading the file on a miss.
    pub async fn read_or_load(&self, path: &Path) -> Result<Bytes, OverlayError> {
        if let Some(hit) = self.get(path) {
            return Ok(hit);
        }
        let bytes = Bytes::from(
            tokio::fs::read(path)
                .await
                .map_err(|e| OverlayError::source_parse(path, e))?,
        );
        self.insert(path.to_path_buf(), bytes.clone());
        Ok(bytes)
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.total_bytes = 0;
    }

    #[cfg(test)]
    pub fn total_bytes(&self) -> usize {
        self.lock().total_bytes
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
