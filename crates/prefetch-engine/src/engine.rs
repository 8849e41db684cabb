//! The engine handle and its builder.

use std::sync::Arc;

use prefetch_cache::{CacheSnapshot, RouteStore};
use prefetch_core::{
    get_route_path, Listeners, PrefetchConfig, RouteClassifier, RouteInfo, RoutePathOptions,
    SharedValue, SiteRouteClassifier,
};
use prefetch_data::{AssetLocator, Transport};
use prefetch_executor::RequestPool;

use crate::error::PrefetchError;
use crate::stats::EngineStats;
use crate::template::TemplateRegistry;

pub(crate) struct EngineInner {
    pub(crate) config: PrefetchConfig,
    pub(crate) path_options: RoutePathOptions,
    pub(crate) locator: AssetLocator,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) classifier: Arc<dyn RouteClassifier>,
    pub(crate) pool: RequestPool,
    pub(crate) store: RouteStore,
    pub(crate) templates: TemplateRegistry,
    pub(crate) reload_listeners: Listeners,
    pub(crate) stats: EngineStats,
}

/// Prefetch and cache manager for one site.
///
/// Owns the route store, the request pool and the template registry. Clones
/// share all of them; separately built engines share nothing.
#[derive(Clone)]
pub struct PrefetchEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl PrefetchEngine {
    /// Start building an engine from configuration.
    pub fn builder(config: PrefetchConfig) -> PrefetchEngineBuilder {
        PrefetchEngineBuilder::new(config)
    }

    /// Engine configuration.
    pub fn config(&self) -> &PrefetchConfig {
        &self.inner.config
    }

    /// Normalize a raw href or path into a route key.
    pub fn normalize(&self, path: &str) -> String {
        get_route_path(path, &self.inner.path_options)
    }

    /// The route store, for read-only inspection.
    pub fn store(&self) -> &RouteStore {
        &self.inner.store
    }

    /// The background request pool.
    pub fn pool(&self) -> &RequestPool {
        &self.inner.pool
    }

    /// The template registry.
    pub fn templates(&self) -> &TemplateRegistry {
        &self.inner.templates
    }

    /// Request counters.
    pub fn stats(&self) -> &EngineStats {
        &self.inner.stats
    }

    /// URL derivation used by this engine.
    pub fn locator(&self) -> &AssetLocator {
        &self.inner.locator
    }

    /// Cached metadata for a path, without fetching.
    pub fn cached_route_info(&self, path: &str) -> Option<Arc<RouteInfo>> {
        self.inner.store.route_info(&self.normalize(path))
    }

    /// Whether a path is marked errored.
    pub fn is_route_errored(&self, path: &str) -> bool {
        self.inner.store.is_errored(&self.normalize(path))
    }

    /// Cached shared-data payload for a hash, without fetching.
    pub fn cached_shared_data(&self, hash: &str) -> Option<SharedValue> {
        self.inner.store.shared_data(hash)
    }

    /// Snapshot of the route store.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.store.snapshot()
    }
}

impl std::fmt::Debug for PrefetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchEngine")
            .field("mode", &self.inner.config.mode)
            .field("pool", &self.inner.pool)
            .field("store", &self.inner.store)
            .finish()
    }
}

/// Builder for [`PrefetchEngine`].
pub struct PrefetchEngineBuilder {
    config: PrefetchConfig,
    transport: Option<Arc<dyn Transport>>,
    classifier: Option<Arc<dyn RouteClassifier>>,
    pool: Option<RequestPool>,
}

impl PrefetchEngineBuilder {
    /// Create a builder from configuration.
    pub fn new(config: PrefetchConfig) -> Self {
        Self {
            config,
            transport: None,
            classifier: None,
            pool: None,
        }
    }

    /// Set the transport used for every request. Required.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set an already shared transport.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the default [`SiteRouteClassifier`].
    pub fn classifier(mut self, classifier: impl RouteClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Use an existing pool instead of one sized from `concurrency`.
    pub fn pool(mut self, pool: RequestPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Validate the configuration and build the engine.
    pub fn build(self) -> Result<PrefetchEngine, PrefetchError> {
        self.config.validate()?;
        let transport = self.transport.ok_or(PrefetchError::MissingTransport)?;

        let pool = self
            .pool
            .unwrap_or_else(|| RequestPool::new(self.config.concurrency));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(SiteRouteClassifier));

        Ok(PrefetchEngine {
            inner: Arc::new(EngineInner {
                path_options: self.config.route_path_options(),
                locator: AssetLocator::new(&self.config),
                config: self.config,
                transport,
                classifier,
                pool,
                store: RouteStore::new(),
                templates: TemplateRegistry::new(),
                reload_listeners: Listeners::new(),
                stats: EngineStats::default(),
            }),
        })
    }
}
