//! Expired-key cleanup background task
//!
//! This module provides ExpiryCleaner that runs in a background thread
//! and periodically calls [`InMemoryBackend::purge_expired`].
//!
//! Lazy expiry already hides expired keys from every read; the cleaner only
//! reclaims memory held by keys nobody touches again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::memory::InMemoryBackend;

/// Background expiry cleanup task
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use keybranch_storage::{ExpiryCleaner, InMemoryBackend};
///
/// let backend = Arc::new(InMemoryBackend::new());
/// let cleaner = ExpiryCleaner::new(Arc::clone(&backend), Duration::from_secs(60));
/// let handle = cleaner.start();
///
/// // ... use the backend ...
///
/// cleaner.shutdown();
/// handle.join().unwrap();
/// ```
pub struct ExpiryCleaner {
    backend: Arc<InMemoryBackend>,
    check_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl ExpiryCleaner {
    /// Create a new cleaner
    pub fn new(backend: Arc<InMemoryBackend>, check_interval: Duration) -> Self {
        Self {
            backend,
            check_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background cleanup thread
    ///
    /// The thread runs until `shutdown()` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let shutdown = Arc::clone(&self.shutdown);
        let check_interval = self.check_interval;

        thread::spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                // Sleep in short slices so shutdown is noticed quickly
                let sleep_interval = Duration::from_millis(100).min(check_interval);
                let mut elapsed = Duration::ZERO;

                while elapsed < check_interval {
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(sleep_interval);
                    elapsed += sleep_interval;
                }

                let purged = backend.purge_expired();
                if purged > 0 {
                    debug!(target: "keybranch::storage", purged, "Expiry cleaner pass");
                }
            }
        })
    }

    /// Signal shutdown; the thread exits on its next check
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
