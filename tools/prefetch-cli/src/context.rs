//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use prefetch_core::PrefetchConfig;
use prefetch_data::ReqwestTransport;
use prefetch_engine::PrefetchEngine;

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Effective engine configuration.
    pub config: PrefetchConfig,
    /// File the configuration was read from, if any.
    pub config_source: Option<PathBuf>,
    /// Site URL relative requests are resolved against.
    pub base_url: Option<String>,
    /// Output handler.
    pub output: Output,
}

impl Context {
    /// Load context from a config file and the environment.
    ///
    /// Environment variables override file values.
    pub fn load(config_path: Option<&str>, base_url: Option<String>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_source) = match config_path {
            Some(path) => {
                let config = PrefetchConfig::load(path)
                    .with_context(|| format!("Failed to load config from {}", path))?;
                (config, Some(PathBuf::from(path)))
            }
            None => match Self::find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (PrefetchConfig::default(), None),
            },
        };

        let config = config
            .merge_lookup(|key| std::env::var(key).ok())
            .context("Invalid PREFETCH_* environment variable")?;

        if let Some(path) = &config_source {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config,
            config_source,
            base_url,
            output,
        })
    }

    /// Find a config file in the directory tree.
    fn find_config(start: &Path) -> Option<(PrefetchConfig, PathBuf)> {
        let config_names = ["prefetch.toml", ".prefetch.toml", "prefetch.json"];

        let mut current = start.to_path_buf();
        loop {
            for name in &config_names {
                let config_path = current.join(name);
                if config_path.exists() {
                    if let Ok(config) = PrefetchConfig::load(&config_path) {
                        return Some((config, config_path));
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Build an engine over HTTP.
    ///
    /// Background preloading is disabled: there are no visible links here.
    pub fn engine(&self) -> Result<PrefetchEngine> {
        let mut transport = ReqwestTransport::new();
        if let Some(base_url) = &self.base_url {
            transport = transport.with_base_url(base_url.clone());
        }

        PrefetchEngine::builder(self.config.clone().without_preload())
            .transport(transport)
            .build()
            .context("Failed to build prefetch engine")
    }
}
