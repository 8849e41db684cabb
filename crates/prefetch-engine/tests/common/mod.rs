//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prefetch_data::{FetchError, Transport};
use prefetch_engine::{PrefetchConfig, PrefetchEngine, PreloadError, RequestPool, Template};
use serde_json::{json, Value};

type RequestHook = Arc<dyn Fn(&str) + Send + Sync>;

enum Reply {
    Json(Value),
    Status(u16),
}

/// Scripted transport: per-URL replies, call counters, latency and a hook
/// invoked as each request is issued. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Mutex<Duration>,
    hook: Mutex<Option<RequestHook>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, url: &str, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Json(body));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Status(status));
    }

    /// Latency applied to every request.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Latency applied to one URL, overriding the global latency.
    pub fn set_delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn on_request<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.hook.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let hook = self.hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(url);
        }

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or_else(|| *self.latency.lock().unwrap());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.replies.lock().unwrap().get(url) {
            Some(Reply::Json(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(FetchError::Http {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(FetchError::Http {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Published-mode URL of a route's metadata under the default config.
pub fn route_url(path: &str) -> String {
    if path == "/" {
        "/routeInfo.json".to_string()
    } else {
        format!("/{}/routeInfo.json", path.trim_matches('/'))
    }
}

/// Published-mode URL of a shared-data payload under the default config.
pub fn shared_url(hash: &str) -> String {
    format!("/staticData/{}.json", hash)
}

/// A route-info payload.
pub fn route_payload(path: &str, template: &str, props: &[(&str, &str)]) -> Value {
    let hashes: HashMap<&str, &str> = props.iter().copied().collect();
    json!({
        "path": path,
        "template": template,
        "sharedHashesByProp": hashes,
    })
}

pub fn test_config() -> PrefetchConfig {
    PrefetchConfig::default().without_preload()
}

pub fn engine(transport: &Arc<MockTransport>) -> PrefetchEngine {
    engine_with(test_config(), transport)
}

pub fn engine_with(config: PrefetchConfig, transport: &Arc<MockTransport>) -> PrefetchEngine {
    PrefetchEngine::builder(config)
        .shared_transport(transport.clone())
        .build()
        .unwrap()
}

pub fn engine_with_pool(transport: &Arc<MockTransport>, pool: RequestPool) -> PrefetchEngine {
    PrefetchEngine::builder(test_config())
        .shared_transport(transport.clone())
        .pool(pool)
        .build()
        .unwrap()
}

/// Template counting its preloads, optionally failing them.
#[derive(Default)]
pub struct CountingTemplate {
    preloads: AtomicUsize,
    fail: bool,
}

impl CountingTemplate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            preloads: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn preloads(&self) -> usize {
        self.preloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Template for CountingTemplate {
    fn supports_preload(&self) -> bool {
        true
    }

    async fn preload(&self) -> Result<(), PreloadError> {
        self.preloads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            Err(PreloadError::new("chunk failed to load"))
        } else {
            Ok(())
        }
    }
}

/// Build a template map from `(id, template)` pairs.
pub fn templates(entries: &[(&str, Arc<CountingTemplate>)]) -> HashMap<String, Arc<dyn Template>> {
    entries
        .iter()
        .map(|(id, template)| (id.to_string(), template.clone() as Arc<dyn Template>))
        .collect()
}
