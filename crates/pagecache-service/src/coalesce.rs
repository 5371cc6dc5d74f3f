//! Per-key async locks used to coalesce concurrent snapshot minting.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A set of async mutexes addressed by string key.
///
/// Entries are held weakly and pruned once no caller holds or waits on
/// them, so the map only grows with the number of keys in flight.
#[derive(Default)]
pub struct KeyedLock {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

/// Holds one key's lock until dropped.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLock {
    /// Creates an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, weak| weak.strong_count() > 0);
            if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
                existing
            } else {
                let created = Arc::new(AsyncMutex::new(()));
                locks.insert(key.to_string(), Arc::downgrade(&created));
                created
            }
        };
        KeyGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of keys currently held or awaited.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for KeyedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLock")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
