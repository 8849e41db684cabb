//! Request deduplication for in-flight fetches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use prefetch_core::lock;

/// A fetch that any number of waiters can await.
pub type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Set once the work behind a table entry has actually begun.
///
/// A fetch queued behind a paused pool is not started; joining it from a
/// caller that keeps the pool paused would never finish.
#[derive(Debug, Clone, Default)]
pub struct StartFlag(Arc<AtomicBool>);

impl StartFlag {
    /// Record that the work has begun.
    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the work has begun.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

struct InflightEntry<T, E> {
    id: u64,
    future: SharedFetch<T, E>,
    started: StartFlag,
}

impl<T, E> InflightEntry<T, E> {
    fn handle(&self, key: &str) -> InflightHandle<T, E> {
        InflightHandle {
            key: key.to_string(),
            id: self.id,
            future: self.future.clone(),
        }
    }
}

/// Handle on a table entry, returned to every waiter of the same key.
pub struct InflightHandle<T, E> {
    key: String,
    id: u64,
    future: SharedFetch<T, E>,
}

impl<T, E> InflightHandle<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Key the entry was registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the shared fetch to settle.
    pub async fn wait(&self) -> Result<T, E> {
        self.future.clone().await
    }
}

impl<T, E> Clone for InflightHandle<T, E>
where
    T: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            id: self.id,
            future: self.future.clone(),
        }
    }
}

/// At most one live fetch per key.
///
/// The first caller for a key creates the fetch; later callers join it until
/// the entry is settled. Entries carry an id so that a late waiter of an old
/// fetch cannot remove a newer entry for the same key.
pub struct InflightTable<T, E> {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, InflightEntry<T, E>>>,
}

impl<T, E> Default for InflightTable<T, E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T, E> InflightTable<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the live fetch for `key`, or start one with `start`.
    ///
    /// Returns the handle and whether this call created the entry. `start`
    /// runs under the table lock and must not touch the table; it receives
    /// the entry's [`StartFlag`] to mark once its work begins.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> (InflightHandle<T, E>, bool)
    where
        F: FnOnce(StartFlag) -> BoxFuture<'static, Result<T, E>>,
    {
        let mut entries = lock(&self.entries);

        if let Some(entry) = entries.get(key) {
            return (entry.handle(key), false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let started = StartFlag::default();
        let entry = InflightEntry {
            id,
            future: start(started.clone()).shared(),
            started,
        };
        let handle = entry.handle(key);
        entries.insert(key.to_string(), entry);

        (handle, true)
    }

    /// Join the live fetch for `key` without ever creating one.
    pub fn join(&self, key: &str) -> Option<InflightHandle<T, E>> {
        lock(&self.entries).get(key).map(|entry| entry.handle(key))
    }

    /// Like [`join`](Self::join), but only once the fetch's work has begun.
    pub fn join_started(&self, key: &str) -> Option<InflightHandle<T, E>> {
        lock(&self.entries)
            .get(key)
            .filter(|entry| entry.started.is_set())
            .map(|entry| entry.handle(key))
    }

    /// Remove the entry the handle belongs to.
    ///
    /// Returns `false` when the entry was already removed or replaced.
    pub fn settle(&self, handle: &InflightHandle<T, E>) -> bool {
        let mut entries = lock(&self.entries);
        match entries.get(&handle.key) {
            Some(entry) if entry.id == handle.id => {
                entries.remove(&handle.key);
                true
            }
            _ => false,
        }
    }

    /// Whether a fetch is live for `key`.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with a live fetch.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }

    /// Drop every entry. Waiters already holding a handle keep waiting.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}
