//! Public prefetch entry point.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::PrefetchEngine;
use crate::error::PrefetchError;
use crate::route_info::FetchOptions;

/// Which halves of a route to prefetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchKind {
    /// Shared data only.
    Data,
    /// Template only.
    Template,
    /// Both, concurrently.
    #[default]
    All,
}

impl FromStr for PrefetchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data" => Ok(Self::Data),
            "template" => Ok(Self::Template),
            "all" => Ok(Self::All),
            other => Err(format!("unknown prefetch type: {}", other)),
        }
    }
}

impl std::fmt::Display for PrefetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Template => write!(f, "template"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Options for [`PrefetchEngine::prefetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchOptions {
    pub kind: PrefetchKind,
    pub priority: bool,
}

impl PrefetchOptions {
    /// Prefetch both halves in the background.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one half.
    pub fn with_kind(mut self, kind: PrefetchKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark as user-triggered.
    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }
}

impl PrefetchEngine {
    /// Prefetch a route's data, template or both.
    ///
    /// A priority call pauses the pool until it returns, on every exit path.
    /// Overlapping priority calls keep it paused until the last one returns.
    pub async fn prefetch(&self, path: &str, options: PrefetchOptions) -> Result<(), PrefetchError> {
        let path = self.normalize(path);
        let _hold = options.priority.then(|| self.inner.pool.hold());
        let fetch = FetchOptions {
            priority: options.priority,
        };

        match options.kind {
            PrefetchKind::Data => {
                self.prefetch_data(&path, fetch).await;
                Ok(())
            }
            PrefetchKind::Template => self.prefetch_template(&path, fetch).await.map(|_| ()),
            PrefetchKind::All => {
                let ((), template) = tokio::join!(
                    self.prefetch_data(&path, fetch),
                    self.prefetch_template(&path, fetch)
                );
                template.map(|_| ())
            }
        }
    }
}
