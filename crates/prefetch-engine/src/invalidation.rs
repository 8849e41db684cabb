//! Cache invalidation and reload subscriptions.

use prefetch_core::SubscriptionId;
use tracing::info;

use crate::engine::PrefetchEngine;

impl PrefetchEngine {
    /// Drop every cached route, error marker, shared payload and inflight
    /// entry, then notify reload subscribers once.
    ///
    /// Requests already in flight are not cancelled and may repopulate the
    /// caches when they settle.
    pub fn reload_route_data(&self) -> usize {
        self.inner.store.clear();
        let notified = self.inner.reload_listeners.notify();
        info!(subscribers = notified, "route data reloaded");
        notified
    }

    /// Call `callback` after every [`reload_route_data`](Self::reload_route_data).
    pub fn subscribe_reload<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.reload_listeners.subscribe(callback)
    }

    /// Remove a reload subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe_reload(&self, id: SubscriptionId) -> bool {
        self.inner.reload_listeners.unsubscribe(id)
    }
}
