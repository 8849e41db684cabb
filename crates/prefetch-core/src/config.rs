//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable prefix for every recognized option.
pub const ENV_PREFIX: &str = "PREFETCH_";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Where route metadata comes from. The two modes are exclusive per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Live dev server endpoints, with data hot-reloading.
    Development,
    /// Static assets emitted by the site build.
    #[default]
    Production,
}

impl ExecutionMode {
    /// Check for the live/interactive mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "live" => Some(Self::Development),
            "production" | "prod" | "published" => Some(Self::Production),
            _ => None,
        }
    }
}

/// How priority requests treat a concurrent non-priority request for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityDedup {
    /// Always issue a fresh request.
    #[default]
    Fresh,
    /// Await a non-priority request already in flight, if any.
    JoinInflight,
}

impl PriorityDedup {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fresh" => Some(Self::Fresh),
            "join-inflight" | "join_inflight" | "join" => Some(Self::JoinInflight),
            _ => None,
        }
    }
}

/// Background preloading of visible links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Whether the preloader runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between link scans, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl PreloadConfig {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Configuration for a prefetch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Execution mode.
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Background preloader settings.
    #[serde(default)]
    pub preload: PreloadConfig,

    /// Maximum simultaneous background requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Use `site_root` instead of `public_path` as the route-info root.
    #[serde(default)]
    pub disable_route_prefixing: bool,

    /// Site root URL or path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_root: Option<String>,

    /// Public path the site is served under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    /// Location of the `staticData/` directory.
    #[serde(default = "default_assets_path")]
    pub assets_path: String,

    /// Query string appended to route-info requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_bust: Option<String>,

    /// Deployment base path stripped during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Site origin stripped from absolute links during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_origin: Option<String>,

    /// Priority request dedup policy.
    #[serde(default)]
    pub priority_dedup: PriorityDedup,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_concurrency() -> usize {
    5
}

fn default_assets_path() -> String {
    "/".to_string()
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            preload: PreloadConfig::default(),
            concurrency: default_concurrency(),
            disable_route_prefixing: false,
            site_root: None,
            public_path: None,
            assets_path: default_assets_path(),
            cache_bust: None,
            base_path: None,
            site_origin: None,
            priority_dedup: PriorityDedup::default(),
        }
    }
}

impl PrefetchConfig {
    /// Load config from a TOML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            message: e.to_string(),
        })?;

        let config: Self = if path.extension().map_or(false, |e| e == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Build config from `PREFETCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().merge_lookup(lookup)
    }

    /// Override fields with any variables the lookup knows about.
    pub fn merge_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = get("ENV") {
            self.mode = ExecutionMode::parse(&value).ok_or(ConfigError::Invalid { key, value })?;
        }
        if let Some((key, value)) = get("DISABLE_PRELOAD") {
            self.preload.enabled = !parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = get("PRELOAD_POLL_INTERVAL") {
            self.preload.poll_interval_ms = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = get("RATE") {
            self.concurrency = parse_number(&key, &value)?;
        }
        if let Some((key, value)) = get("DISABLE_ROUTE_PREFIXING") {
            self.disable_route_prefixing = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = get("PRIORITY_DEDUP") {
            self.priority_dedup =
                PriorityDedup::parse(&value).ok_or(ConfigError::Invalid { key, value })?;
        }
        if let Some((_, value)) = get("ASSETS_PATH") {
            self.assets_path = value;
        }
        self.site_root = get("SITE_ROOT").map(|(_, v)| v).or(self.site_root);
        self.public_path = get("PUBLIC_PATH").map(|(_, v)| v).or(self.public_path);
        self.cache_bust = get("CACHE_BUST").map(|(_, v)| v).or(self.cache_bust);
        self.base_path = get("BASE_PATH").map(|(_, v)| v).or(self.base_path);
        self.site_origin = get("SITE_ORIGIN").map(|(_, v)| v).or(self.site_origin);

        self.validate()?;
        Ok(self)
    }

    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Validation(
                "concurrency must be a positive integer".to_string(),
            ));
        }
        if self.preload.enabled && self.preload.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "preload.poll_interval_ms must be positive when preloading is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the pool concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the priority dedup policy.
    pub fn with_priority_dedup(mut self, policy: PriorityDedup) -> Self {
        self.priority_dedup = policy;
        self
    }

    /// Set the cache-busting token.
    pub fn with_cache_bust(mut self, token: impl Into<String>) -> Self {
        self.cache_bust = Some(token.into());
        self
    }

    /// Set the assets path.
    pub fn with_assets_path(mut self, assets_path: impl Into<String>) -> Self {
        self.assets_path = assets_path.into();
        self
    }

    /// Disable the background preloader.
    pub fn without_preload(mut self) -> Self {
        self.preload.enabled = false;
        self
    }

    /// Path normalization settings derived from this config.
    pub fn route_path_options(&self) -> crate::RoutePathOptions {
        crate::RoutePathOptions {
            site_origin: self.site_origin.clone(),
            base_path: self.base_path.clone(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PrefetchConfig::default();
        assert_eq!(config.mode, ExecutionMode::Production);
        assert_eq!(config.concurrency, 5);
        assert!(config.preload.enabled);
        assert_eq!(config.preload.poll_interval(), Duration::from_millis(300));
        assert_eq!(config.priority_dedup, PriorityDedup::Fresh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = PrefetchConfig::from_lookup(lookup(&[
            ("PREFETCH_ENV", "development"),
            ("PREFETCH_RATE", "3"),
            ("PREFETCH_DISABLE_PRELOAD", "true"),
            ("PREFETCH_CACHE_BUST", "v=42"),
            ("PREFETCH_PUBLIC_PATH", "/site/"),
            ("PREFETCH_PRIORITY_DEDUP", "join-inflight"),
        ]))
        .unwrap();

        assert!(config.mode.is_development());
        assert_eq!(config.concurrency, 3);
        assert!(!config.preload.enabled);
        assert_eq!(config.cache_bust.as_deref(), Some("v=42"));
        assert_eq!(config.public_path.as_deref(), Some("/site/"));
        assert_eq!(config.priority_dedup, PriorityDedup::JoinInflight);
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = PrefetchConfig::from_lookup(lookup(&[("PREFETCH_RATE", "fast")])).unwrap_err();
        match err {
            ConfigError::Invalid { key, value } => {
                assert_eq!(key, "PREFETCH_RATE");
                assert_eq!(value, "fast");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = PrefetchConfig::from_lookup(lookup(&[("PREFETCH_RATE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_toml_parsing() {
        let config: PrefetchConfig = toml::from_str(
            r#"
            mode = "development"
            concurrency = 8
            cache_bust = "build-7"
            priority_dedup = "join-inflight"

            [preload]
            enabled = false
            "#,
        )
        .unwrap();

        assert!(config.mode.is_development());
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.assets_path, "/");
        assert!(!config.preload.enabled);
        assert_eq!(config.preload.poll_interval_ms, 300);
        assert_eq!(config.priority_dedup, PriorityDedup::JoinInflight);
    }
}
