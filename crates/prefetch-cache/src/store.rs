//! Engine-wide caches for route metadata and shared data.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use prefetch_core::{read, write, RouteInfo, SharedValue};
use prefetch_data::FetchError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::InflightTable;

/// A failed route fetch, as observed by every waiter of that fetch.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    /// Transport error behind the failure.
    pub error: FetchError,
    /// Whether the not-found route is served in place of the failed one.
    ///
    /// Decided once, when the fetch settles.
    pub fall_back: bool,
}

/// Live fetches of raw route payloads, keyed by normalized path.
pub type RouteInfoInflight = InflightTable<SharedValue, RouteFailure>;

/// Live fetches of shared-data payloads, keyed by hash.
pub type SharedDataInflight = InflightTable<SharedValue, FetchError>;

/// Cache state of a single route path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Metadata is cached.
    Hit,
    /// A previous fetch failed; the path is not retried until reload.
    Errored,
    /// A fetch is in flight.
    Inflight,
    /// Nothing is known about the path.
    Miss,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Errored => write!(f, "ERRORED"),
            Self::Inflight => write!(f, "INFLIGHT"),
            Self::Miss => write!(f, "MISS"),
        }
    }
}

/// Point-in-time view of the store, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Paths with cached metadata.
    pub routes: Vec<String>,
    /// Paths marked as errored.
    pub errored: Vec<String>,
    /// Cached shared-data hashes.
    pub shared_hashes: Vec<String>,
    /// Route fetches in flight.
    pub inflight_routes: usize,
    /// Shared-data fetches in flight.
    pub inflight_shared: usize,
}

/// The five tables behind the engine's deduplication and memoization.
///
/// Route metadata is stored as `Arc<RouteInfo>` so every caller observes the
/// same record, including hydration written after the fact.
#[derive(Default)]
pub struct RouteStore {
    route_info_by_path: RwLock<HashMap<String, Arc<RouteInfo>>>,
    errored_paths: RwLock<HashSet<String>>,
    shared_data_by_hash: RwLock<HashMap<String, SharedValue>>,
    inflight_route_info: RouteInfoInflight,
    inflight_shared_data: SharedDataInflight,
}

impl RouteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for a normalized path.
    pub fn route_info(&self, path: &str) -> Option<Arc<RouteInfo>> {
        read(&self.route_info_by_path).get(path).cloned()
    }

    /// Cache metadata for `path`, keeping an existing record if one is present.
    ///
    /// Returns the record every caller must use.
    pub fn store_route_info(&self, path: &str, info: RouteInfo) -> Arc<RouteInfo> {
        let mut routes = write(&self.route_info_by_path);
        Arc::clone(
            routes
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(info)),
        )
    }

    /// Whether a previous fetch of `path` failed.
    pub fn is_errored(&self, path: &str) -> bool {
        read(&self.errored_paths).contains(path)
    }

    /// Record that fetching `path` failed.
    pub fn mark_errored(&self, path: &str) {
        write(&self.errored_paths).insert(path.to_string());
    }

    /// Cached shared-data payload for a hash.
    pub fn shared_data(&self, hash: &str) -> Option<SharedValue> {
        read(&self.shared_data_by_hash).get(hash).cloned()
    }

    /// Cache a shared-data payload. An existing payload for the hash wins.
    pub fn store_shared_data(&self, hash: &str, value: SharedValue) -> SharedValue {
        let mut shared = write(&self.shared_data_by_hash);
        Arc::clone(shared.entry(hash.to_string()).or_insert(value))
    }

    /// Route fetch deduplication table.
    pub fn inflight_route_info(&self) -> &RouteInfoInflight {
        &self.inflight_route_info
    }

    /// Shared-data fetch deduplication table.
    pub fn inflight_shared_data(&self) -> &SharedDataInflight {
        &self.inflight_shared_data
    }

    /// Cache state of a normalized path.
    pub fn status(&self, path: &str) -> CacheStatus {
        if read(&self.route_info_by_path).contains_key(path) {
            CacheStatus::Hit
        } else if self.is_errored(path) {
            CacheStatus::Errored
        } else if self.inflight_route_info.contains(path) {
            CacheStatus::Inflight
        } else {
            CacheStatus::Miss
        }
    }

    /// Empty all five tables.
    ///
    /// Fetches already in flight still resolve for their waiters but are no
    /// longer joinable.
    pub fn clear(&self) {
        write(&self.route_info_by_path).clear();
        write(&self.errored_paths).clear();
        write(&self.shared_data_by_hash).clear();
        self.inflight_route_info.clear();
        self.inflight_shared_data.clear();
        debug!("route store cleared");
    }

    /// Sorted view of the store contents.
    pub fn snapshot(&self) -> CacheSnapshot {
        let mut routes: Vec<String> = read(&self.route_info_by_path).keys().cloned().collect();
        let mut errored: Vec<String> = read(&self.errored_paths).iter().cloned().collect();
        let mut shared_hashes: Vec<String> =
            read(&self.shared_data_by_hash).keys().cloned().collect();
        routes.sort();
        errored.sort();
        shared_hashes.sort();

        CacheSnapshot {
            routes,
            errored,
            shared_hashes,
            inflight_routes: self.inflight_route_info.len(),
            inflight_shared: self.inflight_shared_data.len(),
        }
    }
}

impl std::fmt::Debug for RouteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteStore")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::FutureExt;
    use serde_json::json;

    #[test]
    fn test_store_route_info_keeps_first_record() {
        let store = RouteStore::new();

        let first = store.store_route_info("about", RouteInfo::new("about").with_template("A"));
        let second = store.store_route_info("about", RouteInfo::new("about").with_template("B"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.template(), Some("A"));
        assert!(Arc::ptr_eq(&first, &store.route_info("about").unwrap()));
    }

    #[test]
    fn test_status_precedence() {
        let store = RouteStore::new();
        assert_eq!(store.status("about"), CacheStatus::Miss);

        store.mark_errored("ghost");
        assert_eq!(store.status("ghost"), CacheStatus::Errored);

        store.store_route_info("about", RouteInfo::new("about"));
        assert_eq!(store.status("about"), CacheStatus::Hit);
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
    }

    #[tokio::test]
    async fn test_inflight_status() {
        let store = RouteStore::new();
        let (handle, _) = store
            .inflight_route_info()
            .join_or_start("slow", |_| async { Ok(Arc::new(json!({ "path": "slow" }))) }.boxed());

        assert_eq!(store.status("slow"), CacheStatus::Inflight);
        handle.wait().await.unwrap();
        store.inflight_route_info().settle(&handle);
        assert_eq!(store.status("slow"), CacheStatus::Miss);
    }

    #[test]
    fn test_clear_empties_every_table() {
        let store = RouteStore::new();
        store.store_route_info("about", RouteInfo::new("about"));
        store.mark_errored("ghost");
        store.store_shared_data("h1", Arc::new(json!({ "n": 1 })));
        let _ = store
            .inflight_route_info()
            .join_or_start("slow", |_| futures::future::pending().boxed());
        let _ = store
            .inflight_shared_data()
            .join_or_start("h2", |_| futures::future::pending().boxed());

        let before = store.snapshot();
        assert_eq!(before.routes, vec!["about"]);
        assert_eq!(before.errored, vec!["ghost"]);
        assert_eq!(before.shared_hashes, vec!["h1"]);
        assert_eq!(before.inflight_routes, 1);
        assert_eq!(before.inflight_shared, 1);

        store.clear();
        assert_eq!(store.snapshot(), CacheSnapshot::default());
    }

    #[test]
    fn test_snapshot_serializes() {
        let store = RouteStore::new();
        store.store_route_info("blog", RouteInfo::new("blog"));

        let value = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(value["routes"], json!(["blog"]));
        assert_eq!(value["inflight_routes"], 0);
    }
}
