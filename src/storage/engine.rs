//! Thread-Safe TTL Store
//!
//! This module implements the core of the cache: a map from string keys to
//! expiring entries behind a single `RwLock`.
//!
//! ## Expiry Model
//!
//! 1. **Absolute deadlines**: each entry records `expires_at` once, at insertion.
//!    It is never rewritten; a new `set` replaces the whole entry.
//! 2. **Lazy on read**: `get` compares the deadline against the current instant
//!    and hides stale entries, but never removes them and never takes the write lock.
//! 3. **Eventual on removal**: stale entries are physically dropped only by
//!    `delete` or by a sweep (`delete_expired`), usually run by the background
//!    [`ExpirySweeper`](crate::storage::ExpirySweeper).
//!
//! ## Entry Lifecycle
//!
//! ```text
//!  Absent ──set──▶ Present(fresh) ──time──▶ Present(expired) ──delete/sweep──▶ Absent
//!                        │                                                      ▲
//!                        └───────────────────────delete─────────────────────────┘
//! ```

use crate::error::{StoreError, StoreResult};
use crate::storage::config::StoreConfig;
use crate::storage::expiry::ExpirySweeper;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// A stored value with its creation time and optional deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    value: V,
    /// None = never expires
    expires_at: Option<Instant>,
    created_at: Instant,
}

impl<V> Entry<V> {
    /// Creates an entry that never expires.
    pub fn new(value: V) -> Self {
        Self {
            value,
            expires_at: None,
            created_at: Instant::now(),
        }
    }

    /// Creates an entry that expires `ttl` from now.
    ///
    /// A zero `ttl` yields an entry that never expires. So does a `ttl` too
    /// large to be represented as an `Instant`.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };

        Self {
            value,
            expires_at,
            created_at: now,
        }
    }

    /// Returns a reference to the stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the stored value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the deadline, or None if the entry never expires.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Returns when the entry was inserted.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Checks whether the deadline is strictly before `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Returns the remaining lifetime, or None if the entry never expires.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// Snapshot of store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Entries physically present, including logically expired ones
    pub entries: usize,
    pub get_ops: u64,
    pub hits: u64,
    pub misses: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    /// Entries removed by sweeps
    pub expired: u64,
    /// Completed sweep passes
    pub sweeps: u64,
}

/// State shared between a store and its sweeper task.
pub(crate) struct Shared<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    get_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
    sweep_count: AtomicU64,
}

impl<V> Shared<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            get_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
            sweep_count: AtomicU64::new(0),
        }
    }

    // Every critical section leaves the map consistent, so a poisoned
    // lock still guards a valid map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    /// Removes entries that were expired at scan time.
    ///
    /// Phase one collects candidate keys under the read lock. Phase two takes
    /// the write lock and removes the candidates that are still present and
    /// still expired relative to the scan instant. A key deleted in between is
    /// skipped; a key replaced by a fresh `set` in between survives.
    pub(crate) fn delete_expired(&self) -> u64 {
        let now = Instant::now();

        let candidates = self.collect_expired(now);
        let removed = if candidates.is_empty() {
            0
        } else {
            self.remove_expired(&candidates, now)
        };

        self.sweep_count.fetch_add(1, Ordering::Relaxed);
        if removed > 0 {
            self.expired_count.fetch_add(removed, Ordering::Relaxed);
        }

        removed
    }

    fn collect_expired(&self, now: Instant) -> Vec<String> {
        let entries = self.read();
        entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn remove_expired(&self, candidates: &[String], now: Instant) -> u64 {
        let mut entries = self.write();
        let mut removed = 0u64;
        for key in candidates {
            if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
                entries.remove(key);
                removed += 1;
            }
        }
        removed
    }
}

/// An in-process key/value cache with per-entry TTL.
///
/// The store is meant to be wrapped in an `Arc` and shared across threads or
/// tasks. All operations take `&self`.
///
/// When the sweep interval is non-zero, the constructor starts one background
/// [`ExpirySweeper`] owned by this store. It runs until [`TtlStore::close`] is
/// called or the store is dropped.
///
/// # Example
///
/// ```
/// use ttlstore::storage::TtlStore;
/// use std::time::Duration;
///
/// // No default TTL, no background sweeper
/// let store: TtlStore<String> = TtlStore::new(Duration::ZERO, Duration::ZERO);
///
/// store.set("name", "Ariz".to_string());
/// assert_eq!(store.get("name"), Some("Ariz".to_string()));
///
/// store.set_with_ttl("session", "abc123".to_string(), Duration::from_secs(60));
/// assert!(store.delete("session").is_ok());
/// assert!(store.delete("session").is_err());
/// ```
pub struct TtlStore<V> {
    shared: Arc<Shared<V>>,
    config: StoreConfig,
    /// Per-instance start guard; set at most once
    sweeper: OnceLock<ExpirySweeper>,
    closed: AtomicBool,
}

impl<V> std::fmt::Debug for TtlStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlStore")
            .field("entries", &self.shared.len())
            .field("default_ttl", &self.config.default_ttl)
            .field("sweep_interval", &self.config.sweep_interval)
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

impl<V: Send + Sync + 'static> Default for TtlStore<V> {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl<V: Send + Sync + 'static> TtlStore<V> {
    /// Creates an empty store.
    ///
    /// A zero `default_ttl` means entries set without a TTL never expire.
    /// A zero `sweep_interval` disables the background sweeper.
    pub fn new(default_ttl: Duration, sweep_interval: Duration) -> Self {
        Self::with_config(StoreConfig {
            default_ttl,
            sweep_interval,
        })
    }

    /// Creates an empty store from a configuration.
    ///
    /// The sweeper is spawned on the current Tokio runtime if there is one,
    /// and on a dedicated thread otherwise.
    pub fn with_config(config: StoreConfig) -> Self {
        let store = Self {
            shared: Arc::new(Shared::new()),
            config,
            sweeper: OnceLock::new(),
            closed: AtomicBool::new(false),
        };

        if config.sweeper_enabled() {
            store.start_sweeper();
        }

        store
    }

    /// Starts the background sweeper if it is not already running.
    ///
    /// Idempotent per store: only the first successful call keeps a sweeper.
    /// Returns `true` if this call started the sweeper. Inside a Tokio runtime
    /// the sweeper is a task on it; otherwise it runs on a dedicated thread.
    pub fn start_sweeper(&self) -> bool {
        if !self.config.sweeper_enabled() || self.closed.load(Ordering::Acquire) {
            return false;
        }
        if self.sweeper.get().is_some() {
            return false;
        }

        let sweeper = match ExpirySweeper::start(Arc::clone(&self.shared), self.config.sweep_interval) {
            Ok(sweeper) => sweeper,
            Err(e) => {
                error!("Failed to start expiry sweeper: {}", e);
                return false;
            }
        };

        // A racing caller that loses drops its sweeper, which stops it
        let started = self.sweeper.set(sweeper).is_ok();

        // close() may have run while the sweeper was being spawned
        if self.closed.load(Ordering::Acquire) {
            self.stop_sweeper();
        }

        started
    }
}

impl<V> TtlStore<V> {
    /// Sets a key-value pair using the default TTL.
    ///
    /// Any existing entry for the key is replaced.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, self.config.default_ttl);
    }

    /// Sets a key-value pair with its own TTL.
    ///
    /// A non-zero `ttl` overrides the default for this entry only; a zero
    /// `ttl` falls back to the default.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let ttl = if ttl.is_zero() {
            self.config.default_ttl
        } else {
            ttl
        };
        self.insert(key.into(), value, ttl);
    }

    fn insert(&self, key: String, value: V, ttl: Duration) {
        self.shared.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::with_ttl(value, ttl);
        self.shared.write().insert(key, entry);
    }

    /// Gets a clone of the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired entries
    /// are left in place for the sweeper or an explicit delete.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.get_entry(key).map(Entry::into_value)
    }

    /// Gets a clone of the full entry for a key, including its metadata.
    ///
    /// Returns `None` under the same conditions as [`TtlStore::get`].
    pub fn get_entry(&self, key: &str) -> Option<Entry<V>>
    where
        V: Clone,
    {
        self.shared.get_count.fetch_add(1, Ordering::Relaxed);

        let found = {
            let entries = self.shared.read();
            let now = Instant::now();
            entries
                .get(key)
                .filter(|entry| !entry.is_expired_at(now))
                .cloned()
        };

        let counter = if found.is_some() {
            &self.shared.hit_count
        } else {
            &self.shared.miss_count
        };
        counter.fetch_add(1, Ordering::Relaxed);

        found
    }

    /// Checks if a key exists and is not expired.
    pub fn contains_key(&self, key: &str) -> bool {
        let entries = self.shared.read();
        let now = Instant::now();
        entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Deletes a key.
    ///
    /// An entry that has expired but not yet been swept still counts as
    /// present and is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key is not in the map.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        self.shared.del_count.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.shared.write();
        match entries.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Runs one sweep pass immediately and returns the number of entries removed.
    ///
    /// This is the same pass the background sweeper performs on each tick.
    pub fn delete_expired(&self) -> u64 {
        let removed = self.shared.delete_expired();
        if removed > 0 {
            debug!(expired = removed, "Expired entries removed on demand");
        }
        removed
    }

    /// Returns the number of entries physically present, expired or not.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns true if no entries are physically present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the TTL applied to entries set without one (zero = never expire).
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Returns the background sweep cadence (zero = sweeper disabled).
    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Returns true while this store's background sweeper is running.
    ///
    /// Turns false once the sweeper is stopped, or once its loop has exited
    /// because the hosting runtime shut down.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.get().is_some_and(ExpirySweeper::is_running)
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            entries: self.shared.len(),
            get_ops: self.shared.get_count.load(Ordering::Relaxed),
            hits: self.shared.hit_count.load(Ordering::Relaxed),
            misses: self.shared.miss_count.load(Ordering::Relaxed),
            set_ops: self.shared.set_count.load(Ordering::Relaxed),
            del_ops: self.shared.del_count.load(Ordering::Relaxed),
            expired: self.shared.expired_count.load(Ordering::Relaxed),
            sweeps: self.shared.sweep_count.load(Ordering::Relaxed),
        }
    }

    /// Stops the background sweeper for good.
    ///
    /// The store stays usable; expired entries are then only reclaimed by
    /// explicit deletes or [`TtlStore::delete_expired`]. Calling this more
    /// than once is harmless.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.stop_sweeper();
    }

    fn stop_sweeper(&self) {
        if let Some(sweeper) = self.sweeper.get() {
            sweeper.stop();
        }
    }
}
