//! Background preloading of visible links.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{trace, warn};

use crate::engine::PrefetchEngine;
use crate::orchestrator::PrefetchOptions;

/// A link currently visible to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    /// `false` when the link opted out of prefetching.
    pub prefetch: bool,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            prefetch: true,
        }
    }

    pub fn without_prefetch(mut self) -> Self {
        self.prefetch = false;
        self
    }
}

/// Supplies the links that became visible since the last poll.
pub trait LinkSource: Send + Sync {
    fn visible_links(&self) -> Vec<Link>;
}

/// Periodically prefetches visible links in the background.
pub struct Preloader {
    engine: PrefetchEngine,
    source: Arc<dyn LinkSource>,
    poll_interval: Duration,
}

impl Preloader {
    pub fn new(engine: PrefetchEngine, source: Arc<dyn LinkSource>) -> Self {
        let poll_interval = engine.config().preload.poll_interval();
        Self {
            engine,
            source,
            poll_interval,
        }
    }

    /// Spawn a background prefetch for every eligible visible link.
    ///
    /// Returns the spawned tasks.
    pub fn poll_once(&self) -> Vec<JoinHandle<()>> {
        self.source
            .visible_links()
            .into_iter()
            .filter(|link| link.prefetch && !link.href.is_empty())
            .map(|link| {
                let engine = self.engine.clone();
                tokio::spawn(async move {
                    trace!(href = %link.href, "preloading link");
                    if let Err(err) = engine.prefetch(&link.href, PrefetchOptions::new()).await {
                        warn!(href = %link.href, error = %err, "preload failed");
                    }
                })
            })
            .collect()
    }

    /// Poll forever on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll_once();
            }
        })
    }
}

impl PrefetchEngine {
    /// A preloader over `source`, or `None` when preloading is disabled.
    pub fn preloader(&self, source: Arc<dyn LinkSource>) -> Option<Preloader> {
        self.config()
            .preload
            .enabled
            .then(|| Preloader::new(self.clone(), source))
    }
}
