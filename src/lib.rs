//! # ttlstore - An In-Process Key/Value Cache with TTL
//!
//! ttlstore keeps values in memory under string keys, each with an optional
//! time-to-live. Expired entries disappear from reads immediately and are
//! physically reclaimed by a background sweeper.
//!
//! ## Features
//!
//! - **Generic payloads**: `TtlStore<V>` holds any `Send + Sync` value
//! - **Default and per-entry TTL**: an explicit TTL overrides the store default
//! - **Lazy + Active Expiry**: reads re-check deadlines; a sweeper frees memory
//! - **Per-store sweeper**: started at most once per store, stopped on close or drop
//!
//! ## Quick Start
//!
//! ```
//! use ttlstore::TtlStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Entries live 10 minutes by default; sweep every second
//!     let store = TtlStore::new(Duration::from_secs(600), Duration::from_secs(1));
//!
//!     store.set("simple_key", "value");
//!     store.set_with_ttl("simple_key2", "value2", Duration::from_secs(60));
//!
//!     assert_eq!(store.get("simple_key"), Some("value"));
//!     assert!(store.delete("simple_key").is_ok());
//!     assert!(store.delete("simple_key").is_err());
//!
//!     store.close();
//! }
//! ```
//!
//! ## Lazy + Active Expiry
//!
//! Entries with a TTL are expired in two ways:
//! 1. **Lazy**: `get` treats an entry past its deadline as absent, but leaves it in place
//! 2. **Active**: the sweeper periodically collects expired keys under the read
//!    lock, then removes them under the write lock
//!
//! This ensures memory is reclaimed even for keys that are never accessed again.
//!
//! ## Module Overview
//!
//! - [`storage`]: The TTL store, its configuration and the expiry sweeper
//! - [`error`]: Error types

pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use error::{StoreError, StoreResult};
pub use storage::{Entry, ExpirySweeper, StorageStats, StoreConfig, TtlStore};

/// Version of ttlstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
