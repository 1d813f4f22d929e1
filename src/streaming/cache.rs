//! In-memory descriptor and byte-chunk caches.
//!
//! Entries are keyed by a [`Fingerprint`] of (absolute path, mtime, size), so
//! replacing or touching a file on disk yields a new key and stale entries
//! simply age out. Values are immutable once inserted; a write replaces the
//! whole entry.

use bytes::Bytes;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};
use vidforge_common::config::CacheConfig;
use vidforge_common::AssetDescriptor;

/// Stable identity of a file's current contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the absolute path, modification time and size of a file.
    pub fn of(path: &Path, metadata: &std::fs::Metadata) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(absolute.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(mtime.to_le_bytes());
        hasher.update(metadata.len().to_le_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe map with per-cache TTL and a soft entry cap.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    max_entries: usize,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            ttl,
        }
    }

    /// Return a live entry, dropping it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, key: String, value: V) {
        if self.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// The two caches used on the request path.
///
/// When disabled, every lookup misses and every insert is dropped, which
/// makes the cache observably transparent.
pub struct AssetCache {
    enabled: bool,
    max_chunk_bytes: u64,
    descriptors: TtlCache<Arc<AssetDescriptor>>,
    chunks: TtlCache<Bytes>,
}

impl AssetCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_chunk_bytes: config.max_chunk_bytes,
            descriptors: TtlCache::new(
                config.max_descriptor_entries,
                Duration::from_secs(config.metadata_ttl_secs),
            ),
            chunks: TtlCache::new(
                config.max_chunk_entries,
                Duration::from_secs(config.chunk_ttl_secs),
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn descriptor(&self, fingerprint: &Fingerprint) -> Option<Arc<AssetDescriptor>> {
        if !self.enabled {
            return None;
        }
        self.descriptors.get(fingerprint.as_str())
    }

    pub fn store_descriptor(&self, fingerprint: &Fingerprint, descriptor: Arc<AssetDescriptor>) {
        if self.enabled {
            self.descriptors.insert(fingerprint.to_string(), descriptor);
        }
    }

    /// Whether a range of `length` bytes is small enough to memoize.
    pub fn accepts_chunk(&self, length: u64) -> bool {
        self.enabled && length <= self.max_chunk_bytes
    }

    pub fn chunk(&self, fingerprint: &Fingerprint, start: u64, end: u64) -> Option<Bytes> {
        if !self.enabled {
            return None;
        }
        self.chunks.get(&chunk_key(fingerprint, start, end))
    }

    pub fn store_chunk(&self, fingerprint: &Fingerprint, start: u64, end: u64, bytes: Bytes) {
        if self.accepts_chunk(bytes.len() as u64) {
            self.chunks.insert(chunk_key(fingerprint, start, end), bytes);
        }
    }

    pub fn cleanup_expired(&self) -> (usize, usize) {
        (
            self.descriptors.cleanup_expired(),
            self.chunks.cleanup_expired(),
        )
    }

    pub fn len(&self) -> (usize, usize) {
        (self.descriptors.len(), self.chunks.len())
    }
}

fn chunk_key(fingerprint: &Fingerprint, start: u64, end: u64) -> String {
    format!("{fingerprint}:{start}-{end}")
}

/// Periodically purge expired cache entries.
pub fn start_cleanup_task(cache: Arc<AssetCache>, interval_secs: u64) {
    if interval_secs == 0 || !cache.is_enabled() {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let (descriptors, chunks) = cache.cleanup_expired();
            if descriptors + chunks > 0 {
                tracing::debug!(descriptors, chunks, "Purged expired cache entries");
            }
        }
    });
}
