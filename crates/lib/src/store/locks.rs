//! Per-document-URL mutual exclusion.
//!
//! Both backends run read-modify-write cycles in `update` (and an exists
//! check in `create`) that are not atomic across concurrent callers. A
//! [`DocumentLocks`] map hands out one async mutex per URL; the guard is held
//! for the whole cycle and released on every exit path, including errors.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily populated map of per-URL async locks.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a URL, waiting if another caller holds it.
    pub async fn acquire(&self, url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
