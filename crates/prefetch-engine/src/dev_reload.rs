//! Development hot-reload of route data.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use prefetch_data::FetchError;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::PrefetchEngine;

/// Message type asking for a full route data reload.
pub const RELOAD_ROUTES: &str = "reloadRoutes";

/// A message pushed by the dev server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ChannelMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    /// Whether this message asks for a route data reload.
    pub fn is_reload(&self) -> bool {
        self.kind == RELOAD_ROUTES
    }
}

/// Errors raised while connecting to the dev server's push channel.
#[derive(Debug, thiserror::Error)]
pub enum DevReloadError {
    #[error("failed to fetch message port: {0}")]
    Port(#[from] FetchError),

    #[error("invalid message port announcement: {0}")]
    InvalidPort(String),

    #[error("failed to connect to message channel: {0}")]
    Connect(String),
}

/// Push channel opened against the dev server's message port.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Open the channel and stream its messages until it closes.
    async fn connect(&self, port: u16) -> Result<BoxStream<'static, ChannelMessage>, DevReloadError>;
}

#[derive(Debug, Deserialize)]
struct MessagePort {
    port: u16,
}

/// Reloads route data whenever the dev server announces a data change.
pub struct DevReloadListener {
    engine: PrefetchEngine,
    channel: Arc<dyn MessageChannel>,
}

impl DevReloadListener {
    /// Listen on `channel` on behalf of `engine`.
    pub fn new(engine: PrefetchEngine, channel: Arc<dyn MessageChannel>) -> Self {
        Self { engine, channel }
    }

    /// Connect and process messages until the channel closes.
    ///
    /// Returns the number of reloads performed.
    pub async fn run(&self) -> Result<usize, DevReloadError> {
        let port_url = self.engine.locator().message_port_url();
        let announcement = self.engine.inner.transport.get_json(port_url).await?;
        let MessagePort { port } = serde_json::from_value(announcement)
            .map_err(|e| DevReloadError::InvalidPort(e.to_string()))?;

        let mut messages = self.channel.connect(port).await?;
        info!(port, "data hot-loader connected, listening for data changes");

        let mut reloads = 0;
        while let Some(message) = messages.next().await {
            if message.is_reload() {
                self.engine.reload_route_data();
                reloads += 1;
            } else {
                debug!(kind = %message.kind, "ignoring dev server message");
            }
        }
        Ok(reloads)
    }

    /// Run on a background task, logging any connection error.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.run().await {
                Ok(reloads) => debug!(reloads, "data hot-loader channel closed"),
                Err(err) => warn!(error = %err, "data hot-loader failed"),
            }
        })
    }
}

impl PrefetchEngine {
    /// A hot-reload listener, or `None` outside development mode.
    pub fn dev_reload_listener(&self, channel: Arc<dyn MessageChannel>) -> Option<DevReloadListener> {
        self.config()
            .mode
            .is_development()
            .then(|| DevReloadListener::new(self.clone(), channel))
    }
}
