//! Per-series and per-resource single-writer locks.
//!
//! Every write path takes the locks it needs through [`LockRegistry::acquire`], which
//! sorts the keys first. Two commands on different series and different resources
//! never contend, and overlapping key sets cannot deadlock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Series(Uuid),
    Resource(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Series(id) => write!(f, "series:{}", id),
            LockKey::Resource(id) => write!(f, "resource:{}", id),
        }
    }
}

type LockMap = HashMap<LockKey, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default, Clone)]
pub struct LockRegistry {
    locks: Arc<Mutex<LockMap>>,
}

/// Guards held for the duration of one command. Dropping it releases every key.
#[derive(Debug)]
pub struct LockSet {
    keys: Vec<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl LockSet {
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        self.guards.clear();
        // Entries nobody holds or waits on are dropped so the map tracks live keys only
        let mut locks = lock_map(&self.locks);
        for key in &self.keys {
            if locks
                .get(key)
                .is_some_and(|handle| Arc::strong_count(handle) == 1)
            {
                locks.remove(key);
            }
        }
    }
}

// The map only hands out handles, so a poisoned guard still holds a valid map
fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|e| e.into_inner())
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently held or waited on.
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle(&self, key: &LockKey) -> Arc<AsyncMutex<()>> {
        lock_map(&self.locks)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Locks every key in a global order.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> LockSet {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.handle(key).lock_owned().await);
        }
        LockSet {
            keys,
            guards,
            locks: Arc::clone(&self.locks),
        }
    }
}
