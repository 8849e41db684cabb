//! Template registry and template prefetching.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use prefetch_core::{read, write, Listeners, SubscriptionId, NOT_FOUND_PATH};
use tracing::debug;

use crate::engine::PrefetchEngine;
use crate::error::{PrefetchError, PreloadError};
use crate::route_info::FetchOptions;

/// A page template known to the registry.
///
/// Only the optional preload step is consumed here.
#[async_trait]
pub trait Template: Send + Sync {
    /// Whether [`preload`](Self::preload) does any work.
    fn supports_preload(&self) -> bool {
        false
    }

    /// Load whatever the template needs before it can render.
    async fn preload(&self) -> Result<(), PreloadError> {
        Ok(())
    }
}

/// Templates by id, the path binding table and template error markers.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<dyn Template>>>,
    by_path: RwLock<HashMap<String, Arc<dyn Template>>>,
    errored_paths: RwLock<HashSet<String>>,
    listeners: Listeners,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every template and bind the not-found route to `not_found_key`.
    ///
    /// Subscribers are notified afterwards.
    pub fn register_templates(
        &self,
        templates: HashMap<String, Arc<dyn Template>>,
        not_found_key: &str,
    ) {
        let not_found = templates.get(not_found_key).cloned();
        *write(&self.templates) = templates;
        self.bind_template(NOT_FOUND_PATH, not_found);
        self.listeners.notify();
    }

    /// Bind a normalized path to a template id.
    ///
    /// An unknown or absent id unbinds the path.
    pub fn bind(&self, path: &str, template_id: Option<&str>) {
        let template = template_id.and_then(|id| self.template(id));
        self.bind_template(path, template);
    }

    fn bind_template(&self, path: &str, template: Option<Arc<dyn Template>>) {
        let mut by_path = write(&self.by_path);
        match template {
            Some(template) => {
                by_path.insert(path.to_string(), template);
            }
            None => {
                by_path.remove(path);
            }
        }
    }

    /// Template registered under an id.
    pub fn template(&self, id: &str) -> Option<Arc<dyn Template>> {
        read(&self.templates).get(id).cloned()
    }

    /// Template bound to a normalized path.
    pub fn template_for_path(&self, path: &str) -> Option<Arc<dyn Template>> {
        read(&self.by_path).get(path).cloned()
    }

    /// Whether a template lookup for the path found nothing.
    pub fn is_errored(&self, path: &str) -> bool {
        read(&self.errored_paths).contains(path)
    }

    fn mark_errored(&self, path: &str) {
        write(&self.errored_paths).insert(path.to_string());
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        read(&self.templates).len()
    }

    /// Whether no template is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `callback` after every [`register_templates`](Self::register_templates).
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Remove a template subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = read(&self.templates).keys().cloned().collect();
        ids.sort();
        f.debug_struct("TemplateRegistry")
            .field("templates", &ids)
            .field("bound_paths", &read(&self.by_path).len())
            .finish()
    }
}

impl PrefetchEngine {
    /// Replace the registered templates. See [`TemplateRegistry::register_templates`].
    pub fn register_templates(
        &self,
        templates: HashMap<String, Arc<dyn Template>>,
        not_found_key: &str,
    ) {
        self.inner.templates.register_templates(templates, not_found_key);
    }

    /// Bind a raw path to a template id.
    pub fn register_template_for_path(&self, path: &str, template_id: Option<&str>) {
        let path = self.normalize(path);
        self.inner.templates.bind(&path, template_id);
    }

    /// Subscribe to template registration.
    pub fn subscribe_templates<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.templates.subscribe(callback)
    }

    /// Resolve a path's template and run its preload once per route.
    ///
    /// The template is looked up under the path of the metadata actually
    /// returned, so a fallback resolves the not-found template. A missing
    /// template is recorded against the requested path and yields `None`.
    /// Preload failures are the only errors returned.
    pub async fn prefetch_template(
        &self,
        path: &str,
        options: FetchOptions,
    ) -> Result<Option<Arc<dyn Template>>, PrefetchError> {
        let path = self.normalize(path);
        let registry = &self.inner.templates;
        let info = self.get_route_info(&path, options).await;

        let lookup_path = match &info {
            Some(info) => {
                let route_path = self.normalize(info.path());
                registry.bind(&route_path, info.template());
                route_path
            }
            None => path.clone(),
        };

        let Some(template) = registry.template_for_path(&lookup_path) else {
            debug!(path = %path, "no template bound");
            registry.mark_errored(&path);
            return Ok(None);
        };

        let Some(info) = info else {
            return Ok(Some(template));
        };

        if !info.template_loaded() && template.supports_preload() {
            let preload = if options.priority {
                template.preload().await
            } else {
                let template = Arc::clone(&template);
                self.inner
                    .pool
                    .add(move || async move { template.preload().await })
                    .await
            };
            preload.map_err(|source| PrefetchError::Preload {
                path: lookup_path.clone(),
                source,
            })?;
            info.mark_template_loaded();
        }

        Ok(Some(template))
    }
}
