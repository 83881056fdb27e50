//! Definition cache
//!
//! Remembers the last request synchronized for each workflow code so a release
//! can resubmit the definition without the caller sending it again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use gateway_api::SyncWorkflowRequest;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

type HandleLocks = Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>;

/// Definition cache entry
#[derive(Debug, Clone)]
pub struct CachedDefinition {
    pub request: SyncWorkflowRequest,
    last_used: u64,
}

/// In-memory definition cache.
///
/// A capacity of 0 keeps every entry; otherwise the least recently used entry
/// is evicted once the cache is full.
pub struct DefinitionCache {
    entries: RwLock<HashMap<i64, CachedDefinition>>,
    capacity: usize,
    clock: AtomicU64,
    handle_locks: HandleLocks,
}

/// Exclusive hold on one workflow code. The lock entry is dropped from the
/// cache once nobody holds or awaits it.
pub struct HandleGuard {
    guard: Option<OwnedMutexGuard<()>>,
    handle: i64,
    locks: HandleLocks,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.handle)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.handle);
        }
    }
}

impl DefinitionCache {
    /// Create a new definition cache
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            clock: AtomicU64::new(0),
            handle_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get the cached request for a workflow code, marking it as recently used
    pub fn get(&self, handle: i64) -> Option<CachedDefinition> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let tick = self.tick();
        entries.get_mut(&handle).map(|entry| {
            entry.last_used = tick;
            entry.clone()
        })
    }

    /// Store the request last synchronized for a workflow code
    pub fn put(&self, handle: i64, request: SyncWorkflowRequest) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        if self.capacity > 0 && !entries.contains_key(&handle) && entries.len() >= self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(handle, _)| *handle)
            {
                debug!("Evicting cached definition for workflow {}", oldest);
                entries.remove(&oldest);
            }
        }

        let entry = CachedDefinition {
            request,
            last_used: self.tick(),
        };
        entries.insert(handle, entry);
    }

    /// Remove a workflow from cache
    pub fn remove(&self, handle: i64) -> Option<CachedDefinition> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&handle)
    }

    /// Get cache size
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity, 0 when unbounded
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serialize read-modify-write sequences on one workflow code
    pub async fn lock_handle(&self, handle: i64) -> HandleGuard {
        let lock = {
            let mut locks = self.handle_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(handle).or_default().clone()
        };
        HandleGuard {
            guard: Some(lock.lock_owned().await),
            handle,
            locks: self.handle_locks.clone(),
        }
    }
}
