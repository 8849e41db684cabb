//! Shared-data hydration.

use futures::future::join_all;
use prefetch_core::SharedValue;
use tracing::{debug, warn};

use crate::engine::PrefetchEngine;
use crate::route_info::FetchOptions;

impl PrefetchEngine {
    /// Hydrate a route's shared data.
    ///
    /// Every prop is resolved concurrently. A prop whose payload cannot be
    /// fetched is stored as `None`; the route still counts as hydrated and is
    /// not retried until the caches are invalidated.
    pub async fn prefetch_data(&self, path: &str, options: FetchOptions) {
        let Some(info) = self.get_route_info(path, options).await else {
            return;
        };

        if !info.begin_hydration() {
            debug!(path = info.path(), "shared data already hydrated");
            return;
        }

        let props = info.shared_hashes_by_prop().iter().map(|(prop, hash)| {
            let info = &info;
            async move {
                let value = self.resolve_shared(hash, options).await;
                info.set_shared_prop(prop.as_str(), value);
            }
        });
        join_all(props).await;
    }

    async fn resolve_shared(&self, hash: &str, options: FetchOptions) -> Option<SharedValue> {
        let store = &self.inner.store;

        if let Some(value) = store.shared_data(hash) {
            return Some(value);
        }

        let url = self.inner.locator.shared_data_url(hash);
        let issued = self
            .issue(store.inflight_shared_data(), hash, url, options.priority, true, |err| err)
            .await;
        if issued.fresh {
            self.inner.stats.record_shared_request();
        }

        let value = match &issued.result {
            Ok(value) => Some(store.store_shared_data(hash, value.clone())),
            Err(err) => {
                warn!(hash, error = %err, "failed to retrieve shared data for route prop");
                self.inner.stats.record_failure();
                None
            }
        };

        issued.settle(store.inflight_shared_data());
        value
    }
}
