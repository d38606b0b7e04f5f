//! Background Expiry Sweeper
//!
//! This module implements the task that periodically scans a store for
//! expired entries and removes them. Reads already hide expired entries
//! ("lazy expiry"); the sweeper is what actually frees their memory.
//!
//! ## Why Do We Need This?
//!
//! An entry that expires and is never read or deleted again would otherwise
//! stay in the map forever.
//!
//! ## Design
//!
//! Each store owns at most one sweeper. The sweeper runs as a Tokio task
//! (on a dedicated thread when the store is built outside a runtime) and:
//! 1. Sleeps for the store's sweep interval
//! 2. Collects expired keys under the read lock
//! 3. Removes them under the write lock, skipping keys that changed meanwhile
//! 4. Logs how many entries were reclaimed
//!
//! The task exits when its [`ExpirySweeper`] handle is stopped or dropped.

use crate::storage::engine::Shared;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::{self, Handle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// Where the sweeper loop is running.
#[derive(Debug)]
enum Worker {
    /// A task on the caller's Tokio runtime
    Task(JoinHandle<()>),
    /// A dedicated thread driving its own current-thread runtime
    Thread(thread::JoinHandle<()>),
}

impl Worker {
    fn is_finished(&self) -> bool {
        match self {
            Worker::Task(handle) => handle.is_finished(),
            Worker::Thread(handle) => handle.is_finished(),
        }
    }
}

/// A handle to a running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    worker: Worker,
}

impl ExpirySweeper {
    /// Starts the sweeper loop for `shared`.
    ///
    /// Inside a Tokio runtime the loop is spawned as a task on it. Otherwise
    /// it gets a dedicated thread running a current-thread runtime, so
    /// synchronous callers are swept too.
    ///
    /// # Errors
    ///
    /// Returns an error if the dedicated thread cannot be spawned.
    pub(crate) fn start<V>(shared: Arc<Shared<V>>, interval: Duration) -> io::Result<Self>
    where
        V: Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = match Handle::try_current() {
            Ok(handle) => Self::spawn_task(&handle, shared, interval, shutdown_rx),
            Err(_) => Self::spawn_thread(shared, interval, shutdown_rx)?,
        };

        info!(interval_ms = interval.as_millis(), "Background expiry sweeper started");

        Ok(Self {
            shutdown_tx,
            worker,
        })
    }

    fn spawn_task<V>(
        runtime: &Handle,
        shared: Arc<Shared<V>>,
        interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Worker
    where
        V: Send + Sync + 'static,
    {
        Worker::Task(runtime.spawn(sweeper_loop(shared, interval, shutdown_rx)))
    }

    fn spawn_thread<V>(
        shared: Arc<Shared<V>>,
        interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> io::Result<Worker>
    where
        V: Send + Sync + 'static,
    {
        let handle = thread::Builder::new()
            .name("ttlstore-sweeper".to_string())
            .spawn(move || {
                let runtime = match runtime::Builder::new_current_thread().enable_time().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to build expiry sweeper runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(sweeper_loop(shared, interval, shutdown_rx));
            })?;

        debug!("Expiry sweeper running on a dedicated thread");
        Ok(Worker::Thread(handle))
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let was_stopped = self.shutdown_tx.send_replace(true);
        if !was_stopped {
            info!("Background expiry sweeper stopped");
        }
    }

    /// Returns true until the sweeper is stopped or its loop has exited.
    ///
    /// The loop also exits when the runtime hosting it shuts down.
    pub fn is_running(&self) -> bool {
        !*self.shutdown_tx.borrow() && !self.worker.is_finished()
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop<V>(
    shared: Arc<Shared<V>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    V: Send + Sync + 'static,
{
    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let expired = shared.delete_expired();

        if expired > 0 {
            debug!(
                expired = expired,
                remaining = shared.len(),
                "Expired entries cleaned up"
            );
        } else {
            trace!("Sweep found no expired entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TtlStore;

    fn sweeping_store(interval: Duration) -> TtlStore<&'static str> {
        TtlStore::new(Duration::ZERO, interval)
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let store = sweeping_store(Duration::from_millis(10));
        assert!(store.is_sweeping());

        // Add some keys with short TTL
        for i in 0..10 {
            store.set_with_ttl(format!("key{}", i), "value", Duration::from_millis(20));
        }

        // Add a persistent key
        store.set("persistent", "value");

        assert_eq!(store.len(), 11);

        // Wait for keys to expire and be cleaned up
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Only the persistent key should remain
        assert_eq!(store.len(), 1);
        assert!(store.contains_key("persistent"));

        let stats = store.stats();
        assert_eq!(stats.expired, 10);
        assert!(stats.sweeps > 0);
    }

    #[tokio::test]
    async fn test_disabled_sweeper_leaves_entries() {
        let store = sweeping_store(Duration::ZERO);
        assert!(!store.is_sweeping());
        assert!(!store.start_sweeper());

        store.set_with_ttl("key", "value", Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("key"), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().sweeps, 0);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let store = sweeping_store(Duration::from_millis(10));

        // The constructor already started it
        assert!(!store.start_sweeper());
        assert!(!store.start_sweeper());
        assert!(store.is_sweeping());
    }

    #[tokio::test]
    async fn test_each_store_gets_its_own_sweeper() {
        let first = sweeping_store(Duration::from_millis(10));
        let second = sweeping_store(Duration::from_millis(10));

        assert!(first.is_sweeping());
        assert!(second.is_sweeping());

        first.set_with_ttl("key", "value", Duration::from_millis(10));
        second.set_with_ttl("key", "value", Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_close() {
        let store = sweeping_store(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;

        store.close();
        assert!(!store.is_sweeping());

        // A closed store cannot restart its sweeper
        assert!(!store.start_sweeper());
        store.close();

        store.set_with_ttl("key", "value", Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Logically gone, but nobody reclaimed it
        assert_eq!(store.get("key"), None);
        assert_eq!(store.len(), 1);

        // Explicit sweeps still work
        assert_eq!(store.delete_expired(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let shared = Arc::new(Shared::<&str>::new());

        {
            let sweeper = ExpirySweeper::start(Arc::clone(&shared), Duration::from_millis(10)).unwrap();
            assert!(sweeper.is_running());
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Sweeper is dropped here
        }

        // The task releases its reference once it sees the shutdown signal
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[tokio::test]
    async fn test_sweeper_keeps_fresh_entries() {
        let store = sweeping_store(Duration::from_millis(10));

        store.set_with_ttl("fresh", "value", Duration::from_secs(60));
        store.set("forever", "value");
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("fresh"), Some("value"));
        assert_eq!(store.get("forever"), Some("value"));
        assert_eq!(store.stats().expired, 0);
    }

    #[test]
    fn test_sweeper_without_runtime_reclaims() {
        // Built from plain threads: the sweeper gets a thread of its own
        let store = sweeping_store(Duration::from_millis(10));
        assert!(store.is_sweeping());
        assert!(!store.start_sweeper());

        store.set_with_ttl("key", "value", Duration::from_millis(1));
        store.set("persistent", "value");
        thread::sleep(Duration::from_millis(200));

        assert_eq!(store.len(), 1);
        assert!(store.contains_key("persistent"));
        assert!(store.stats().expired >= 1);

        store.close();
        assert!(!store.is_sweeping());
    }

    #[test]
    fn test_sweeper_thread_exits_on_drop() {
        let shared = Arc::new(Shared::<&str>::new());

        {
            let sweeper = ExpirySweeper::start(Arc::clone(&shared), Duration::from_millis(10)).unwrap();
            assert!(matches!(sweeper.worker, Worker::Thread(_)));
            thread::sleep(Duration::from_millis(30));
            // Sweeper is dropped here
        }

        thread::sleep(Duration::from_millis(100));
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn test_not_sweeping_after_runtime_shutdown() {
        let runtime = runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let store = {
            let _guard = runtime.enter();
            sweeping_store(Duration::from_millis(10))
        };
        assert!(store.is_sweeping());

        // The task dies with its runtime even though nobody stopped it
        drop(runtime);
        assert!(!store.is_sweeping());
    }
}
