//! URL derivation for route metadata and shared data.

use prefetch_core::{absolute_path, path_join, ExecutionMode, PrefetchConfig};

/// Dev-server prefix for live route metadata.
pub const DEV_ROUTE_INFO_PREFIX: &str = "/__react-static__/routeInfo/";

/// Dev-server endpoint announcing the hot-reload message port.
pub const DEV_MESSAGE_PORT_PATH: &str = "/__react-static__/getMessagePort";

/// Computes request URLs from the engine configuration.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    mode: ExecutionMode,
    route_info_root: String,
    assets_path: String,
    cache_bust: Option<String>,
}

impl AssetLocator {
    /// Derive locations from config.
    ///
    /// The route-info root is the site root when route prefixing is disabled
    /// and the public path otherwise, falling back to `/`.
    pub fn new(config: &PrefetchConfig) -> Self {
        let root = if config.disable_route_prefixing {
            config.site_root.as_deref()
        } else {
            config.public_path.as_deref()
        };

        let mut route_info_root = root.filter(|r| !r.is_empty()).unwrap_or("/").to_string();
        if !route_info_root.ends_with('/') {
            route_info_root.push('/');
        }

        Self {
            mode: config.mode,
            route_info_root,
            assets_path: config.assets_path.clone(),
            cache_bust: config.cache_bust.clone().filter(|c| !c.is_empty()),
        }
    }

    /// Execution mode the locations were derived for.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Location of a route's metadata. `path` must be normalized.
    pub fn route_info_url(&self, path: &str) -> String {
        match self.mode {
            ExecutionMode::Development => {
                let suffix = if path == "/" { "" } else { path };
                format!("{}{}", DEV_ROUTE_INFO_PREFIX, suffix)
            }
            ExecutionMode::Production => {
                let cache_buster = self
                    .cache_bust
                    .as_deref()
                    .map(|token| format!("?{}", token))
                    .unwrap_or_default();

                format!(
                    "{}{}{}",
                    self.route_info_root,
                    path_join(&[path, "routeInfo.json"]),
                    cache_buster
                )
            }
        }
    }

    /// Location of a shared-data payload.
    pub fn shared_data_url(&self, hash: &str) -> String {
        let file = format!("staticData/{}.json", hash);
        absolute_path(&path_join(&[&self.assets_path, &file]))
    }

    /// Location of the dev hot-reload port announcement.
    pub fn message_port_url(&self) -> &'static str {
        DEV_MESSAGE_PORT_PATH
    }
}
