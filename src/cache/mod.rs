//! Typed in-memory cache with per-entry expiry.
//!
//! Expired entries are removed lazily when a stale [`Cache::get`] finds
//! them, and eagerly by [`Cache::clean_expired`]. Every mutation goes
//! through one `RwLock`; plain hits only take the read side.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe key/value store with time-to-live
#[derive(Debug)]
pub struct Cache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::DEFAULT_CACHE_TTL_SECS))
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a cache whose entries live for `default_ttl` unless overridden
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Time-to-live used when `set` is given no expiration
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or replace an entry
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Instant::now();
        // An overflowing TTL means "effectively never"
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365 * 100));

        self.entries
            .write()
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Get a live value, evicting it if it has expired
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Another caller may have replaced the entry between the two locks
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                trace!("Evicted stale cache entry on read");
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Remove an entry; absent keys are ignored
    pub fn remove(&self, key: &K) {
        self.entries.write().remove(key);
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn clean_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, including ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Run [`Cache::clean_expired`] every `period` until the handle is
    /// aborted or the last strong reference to the cache is dropped
    pub fn spawn_sweeper(cache: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(cache);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped; sweeper stopping");
                    break;
                };
                let removed = cache.clean_expired();
                if removed > 0 {
                    debug!(removed, "Swept expired cache entries");
                }
            }
        })
    }
}
