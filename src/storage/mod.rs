//! Storage Module
//!
//! This module provides the TTL store and its background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 TtlStore<V>                 │
//! │   RwLock<HashMap<String, Entry<V>>>         │
//! │   set / get / delete / delete_expired       │
//! └─────────────────────────────────────────────┘
//!                        ▲
//!                        │  read lock: scan
//!                        │  write lock: remove
//!          ┌─────────────┴─────────────┐
//!          │      ExpirySweeper        │
//!          │  (one Tokio task / store) │
//!          └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Single RwLock**: concurrent readers, exclusive writers, no partial states
//! - **Per-entry TTL**: explicit TTLs override the store's default
//! - **Lazy Expiry**: reads hide expired entries without removing them
//! - **Active Expiry**: a per-store sweeper reclaims expired entries
//!
//! ## Example
//!
//! ```
//! use ttlstore::storage::{StoreConfig, TtlStore};
//! use std::time::Duration;
//!
//! let config = StoreConfig::new()
//!     .with_default_ttl(Duration::from_secs(600))
//!     .without_sweeper();
//! let store: TtlStore<u64> = TtlStore::with_config(config);
//!
//! store.set("visits", 1);
//! store.set_with_ttl("token", 42, Duration::from_secs(60));
//!
//! assert_eq!(store.get("visits"), Some(1));
//! assert_eq!(store.len(), 2);
//! ```

pub mod config;
pub mod engine;
pub mod expiry;

// Re-export commonly used types
pub use config::StoreConfig;
pub use engine::{Entry, StorageStats, TtlStore};
pub use expiry::ExpirySweeper;
