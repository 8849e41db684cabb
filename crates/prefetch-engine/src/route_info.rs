//! Route metadata lookup with deduplicated fetching and 404 fallback.

use std::sync::Arc;

use prefetch_cache::RouteFailure;
use prefetch_core::{RouteInfo, NOT_FOUND_PATH};
use prefetch_data::FetchError;
use tracing::{debug, warn};

use crate::engine::PrefetchEngine;

/// Per-call request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Bypass the pool and the inflight tables.
    pub priority: bool,
}

impl FetchOptions {
    /// Options for a user-triggered request.
    pub fn priority() -> Self {
        Self { priority: true }
    }

    /// Options for a background request.
    pub fn background() -> Self {
        Self { priority: false }
    }
}

/// Outcome of [`PrefetchEngine::lookup_route_info`].
#[derive(Debug, Clone)]
pub enum RouteLookup {
    /// The path is not a prefetchable route; nothing was consulted.
    Skipped,
    /// Served from the cache.
    Hit(Arc<RouteInfo>),
    /// Fetched and cached by this call.
    Fetched(Arc<RouteInfo>),
    /// The path failed; this is the not-found route's metadata.
    Fallback(Arc<RouteInfo>),
    /// The path is marked errored and no fallback applied.
    Errored,
}

impl RouteLookup {
    /// The metadata the caller should use, if any.
    pub fn route_info(&self) -> Option<&Arc<RouteInfo>> {
        match self {
            Self::Hit(info) | Self::Fetched(info) | Self::Fallback(info) => Some(info),
            Self::Skipped | Self::Errored => None,
        }
    }

    /// Owned form of [`route_info`](Self::route_info).
    pub fn into_route_info(self) -> Option<Arc<RouteInfo>> {
        match self {
            Self::Hit(info) | Self::Fetched(info) | Self::Fallback(info) => Some(info),
            Self::Skipped | Self::Errored => None,
        }
    }

    /// Whether the returned metadata belongs to the not-found route.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Short label for logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Hit(_) => "hit",
            Self::Fetched(_) => "fetched",
            Self::Fallback(_) => "fallback",
            Self::Errored => "errored",
        }
    }
}

/// Resolution of a single key, before the fallback policy.
enum Resolved {
    Hit(Arc<RouteInfo>),
    Fetched(Arc<RouteInfo>),
    /// Marked errored earlier, the payload was invalid, or the request
    /// failed with no fallback available.
    Errored,
    /// The request failed and the not-found route is served instead.
    FallBack,
}

impl PrefetchEngine {
    /// Resolve metadata for a path.
    ///
    /// Never fails: transport and payload errors are recorded as error
    /// markers. A network failure falls back once to the not-found route when
    /// that route is neither cached nor errored at the moment the request
    /// fails. Every waiter of a shared request gets the same outcome.
    pub async fn lookup_route_info(&self, path: &str, options: FetchOptions) -> RouteLookup {
        let path = self.normalize(path);

        if !self.inner.classifier.is_prefetchable(&path) {
            debug!(path = %path, "not a prefetchable route");
            return RouteLookup::Skipped;
        }

        match self.resolve_route(&path, options).await {
            Resolved::Hit(info) => RouteLookup::Hit(info),
            Resolved::Fetched(info) => RouteLookup::Fetched(info),
            Resolved::Errored => RouteLookup::Errored,
            Resolved::FallBack => self.fall_back(&path, options).await,
        }
    }

    /// Metadata for a path, or `None` when skipped or errored.
    pub async fn get_route_info(&self, path: &str, options: FetchOptions) -> Option<Arc<RouteInfo>> {
        self.lookup_route_info(path, options).await.into_route_info()
    }

    async fn fall_back(&self, failed: &str, options: FetchOptions) -> RouteLookup {
        debug!(path = %failed, "falling back to not-found route");

        match self.resolve_route(NOT_FOUND_PATH, options).await {
            Resolved::Hit(info) | Resolved::Fetched(info) => RouteLookup::Fallback(info),
            Resolved::Errored | Resolved::FallBack => RouteLookup::Errored,
        }
    }

    /// Failure handler for a route request.
    ///
    /// Runs once per failed request, before any waiter sees the failure, so
    /// the fallback guard is evaluated a single time.
    fn route_failure(&self, path: &str) -> impl FnOnce(FetchError) -> RouteFailure + Send + 'static {
        let inner = Arc::downgrade(&self.inner);
        let path = path.to_string();

        move |error| {
            let Some(inner) = inner.upgrade() else {
                return RouteFailure {
                    error,
                    fall_back: false,
                };
            };

            warn!(path = %path, error = %error, "route info request failed");
            inner.stats.record_failure();

            let store = &inner.store;
            store.mark_errored(&path);
            let fall_back =
                store.route_info(NOT_FOUND_PATH).is_none() && !store.is_errored(NOT_FOUND_PATH);
            if fall_back {
                inner.stats.record_fallback();
            }

            RouteFailure { error, fall_back }
        }
    }

    async fn resolve_route(&self, path: &str, options: FetchOptions) -> Resolved {
        let store = &self.inner.store;

        if let Some(info) = store.route_info(path) {
            debug!(path, "route info cache hit");
            return Resolved::Hit(info);
        }
        if store.is_errored(path) {
            return Resolved::Errored;
        }

        let url = self.inner.locator.route_info_url(path);
        // The dev server answers locally; only published assets go through the pool.
        let pooled = !self.inner.config.mode.is_development();
        let on_error = self.route_failure(path);
        let issued = self
            .issue(
                store.inflight_route_info(),
                path,
                url,
                options.priority,
                pooled,
                on_error,
            )
            .await;
        if issued.fresh {
            self.inner.stats.record_route_request();
        }

        let resolved = match &issued.result {
            // Already recorded by `route_failure`.
            Err(failure) if failure.fall_back => Resolved::FallBack,
            Err(_) => Resolved::Errored,
            Ok(payload) => match RouteInfo::from_payload(payload) {
                Ok(info) => Resolved::Fetched(store.store_route_info(path, info)),
                Err(err) => {
                    warn!(path, error = %err, "discarding invalid route info");
                    store.mark_errored(path);
                    Resolved::Errored
                }
            },
        };

        issued.settle(store.inflight_route_info());
        resolved
    }
}
