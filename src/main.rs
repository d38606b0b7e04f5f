//! ttlstore - soak driver
//!
//! Runs a concurrent set/get/delete workload against a `TtlStore<Bytes>`
//! for a fixed duration, then reports what the expiry sweeper reclaimed.

use anyhow::{bail, Context};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use ttlstore::{StorageStats, StoreConfig, TtlStore};

/// Workload configuration
struct Config {
    /// Store configuration (default TTL, sweep interval)
    store: StoreConfig,
    /// TTL used for the short-lived half of the writes
    ttl: Duration,
    /// Number of concurrent worker tasks
    workers: usize,
    /// Size of the shared key space
    keys: usize,
    /// How long the workload runs
    duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::new().with_sweep_interval(Duration::from_millis(100)),
            ttl: Duration::from_millis(50),
            workers: 4,
            keys: 1_000,
            duration: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        let mut config = Config::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--default-ttl-ms" => {
                    config.store.default_ttl = millis(&arg, args.next())?;
                }
                "--sweep-interval-ms" => {
                    config.store.sweep_interval = millis(&arg, args.next())?;
                }
                "--ttl-ms" => {
                    config.ttl = millis(&arg, args.next())?;
                }
                "--workers" | "-w" => {
                    config.workers = number(&arg, args.next())?;
                }
                "--keys" | "-k" => {
                    config.keys = number(&arg, args.next())?;
                }
                "--duration-ms" | "-d" => {
                    config.duration = millis(&arg, args.next())?;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("ttlstore version {}", ttlstore::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    print_help();
                    bail!("unknown argument: {}", arg);
                }
            }
        }

        if config.workers == 0 || config.keys == 0 {
            bail!("--workers and --keys must be greater than zero");
        }

        Ok(config)
    }
}

fn number(flag: &str, value: Option<String>) -> anyhow::Result<usize> {
    let value = value.with_context(|| format!("{} requires a value", flag))?;
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {}", flag, value))
}

fn millis(flag: &str, value: Option<String>) -> anyhow::Result<Duration> {
    number(flag, value).map(|ms| Duration::from_millis(ms as u64))
}

fn print_help() {
    println!(
        r#"
ttlstore - soak driver for the in-process TTL cache

USAGE:
    ttlstore [OPTIONS]

OPTIONS:
        --default-ttl-ms <MS>     Store default TTL, 0 = never expire (default: 0)
        --sweep-interval-ms <MS>  Sweeper cadence, 0 = disabled (default: 100)
        --ttl-ms <MS>             TTL for short-lived writes (default: 50)
    -w, --workers <N>             Concurrent worker tasks (default: 4)
    -k, --keys <N>                Shared key space size (default: 1000)
    -d, --duration-ms <MS>        Workload duration (default: 2000)
    -v, --version                 Print version information
    -h, --help                    Print this help message

Log verbosity follows RUST_LOG (default: info).
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args()?;

    // Set up logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let store = Arc::new(TtlStore::<Bytes>::with_config(config.store));
    info!(
        default_ttl_ms = config.store.default_ttl.as_millis(),
        sweep_interval_ms = config.store.sweep_interval.as_millis(),
        workers = config.workers,
        keys = config.keys,
        "Store initialized"
    );

    let deadline = Instant::now() + config.duration;
    let workers: Vec<_> = (0..config.workers)
        .map(|worker| {
            let store = Arc::clone(&store);
            tokio::spawn(run_worker(store, worker, config.keys, config.ttl, deadline))
        })
        .collect();

    let mut operations = 0u64;
    for handle in workers {
        operations += handle.await.context("worker task panicked")?;
    }

    report("Workload finished", operations, store.stats());

    // Give the sweeper a couple of passes past the last deadline
    if config.store.sweeper_enabled() {
        tokio::time::sleep(config.ttl + config.store.sweep_interval * 2).await;
        report("After final sweeps", operations, store.stats());
    }

    store.close();
    Ok(())
}

/// Mixed workload over a shared key space; returns the number of operations.
async fn run_worker(
    store: Arc<TtlStore<Bytes>>,
    worker: usize,
    keys: usize,
    ttl: Duration,
    deadline: Instant,
) -> u64 {
    let mut i = 0u64;

    while Instant::now() < deadline {
        let key = format!("key:{}", (i as usize).wrapping_mul(31).wrapping_add(worker) % keys);

        match i % 10 {
            0..=2 => store.set(key, Bytes::from(format!("worker:{}:{}", worker, i))),
            3..=4 => store.set_with_ttl(key, Bytes::from_static(b"short-lived"), ttl),
            5 => {
                let _ = store.delete(&key);
            }
            _ => {
                store.get(&key);
            }
        }

        i += 1;
        if i % 256 == 0 {
            tokio::task::yield_now().await;
        }
    }

    debug!(worker = worker, operations = i, "Worker finished");
    i
}

fn report(stage: &str, operations: u64, stats: StorageStats) {
    info!(
        operations = operations,
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        sets = stats.set_ops,
        deletes = stats.del_ops,
        expired = stats.expired,
        sweeps = stats.sweeps,
        "{}",
        stage
    );
}
