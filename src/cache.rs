//! Content-addressed generation cache
//!
//! In-memory map from [`CacheKey`] to the last successful generation payload for
//! that content. The cache is an explicitly owned object shared through `Arc`;
//! independent executors never see each other's entries.
//!
//! Unbounded by default. An optional entry bound evicts the least recently used
//! entry once exceeded.

mod key;

pub use key::{canonical_payload, CacheKey};

use crate::types::{GenerationResult, TaskId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Cached payload of a successful generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub artifact_url: String,
    pub thumbnail_url: Option<String>,
    pub quality_score: Option<f64>,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry from a successful result. Failed results are never cached.
    pub fn from_result(result: &GenerationResult) -> Option<Self> {
        if !result.success || !result.has_artifact() {
            return None;
        }
        Some(Self {
            artifact_url: result.artifact_url.clone()?,
            thumbnail_url: result.thumbnail_url.clone(),
            quality_score: result.quality_score,
            stored_at: Utc::now(),
        })
    }

    /// Synthesize the result served for a cache hit.
    pub fn to_result(&self, task_id: impl Into<TaskId>) -> GenerationResult {
        GenerationResult::from_cache(
            task_id,
            self.artifact_url.clone(),
            self.thumbnail_url.clone(),
            self.quality_score,
        )
    }
}

struct Slot {
    entry: CacheEntry,
    last_used: u64,
}

pub struct GenerationCache {
    entries: RwLock<HashMap<CacheKey, Slot>>,
    max_entries: Option<usize>,
    clock: AtomicU64,
}

impl Default for GenerationCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl GenerationCache {
    pub fn unbounded() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: None,
            clock: AtomicU64::new(0),
        }
    }

    /// Cache holding at most `max_entries` entries (minimum 1).
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: Some(max_entries.max(1)),
            clock: AtomicU64::new(0),
        }
    }

    pub fn with_limit(max_entries: Option<usize>) -> Self {
        match max_entries {
            Some(limit) => Self::bounded(limit),
            None => Self::unbounded(),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.tick();
        let mut entries = self.entries.write();
        let slot = entries.get_mut(key)?;
        slot.last_used = now;
        Some(slot.entry.clone())
    }

    pub fn store(&self, key: CacheKey, entry: CacheEntry) {
        let now = self.tick();
        let mut entries = self.entries.write();
        entries.insert(
            key,
            Slot {
                entry,
                last_used: now,
            },
        );

        if let Some(limit) = self.max_entries {
            while entries.len() > limit {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, slot)| slot.last_used)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(evicted) => {
                        entries.remove(&evicted);
                        debug!(key = %evicted.short(), "Evicted least recently used cache entry");
                    }
                    None => break,
                }
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
