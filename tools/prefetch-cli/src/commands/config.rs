//! Configuration commands.

use anyhow::{Context as _, Result};
use prefetch_core::ExecutionMode;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.section("Current Configuration");
    match &ctx.config_source {
        Some(path) => ctx.output.field("source", &path.display().to_string()),
        None => ctx.output.field("source", "defaults and environment"),
    }
    if let Some(base_url) = &ctx.base_url {
        ctx.output.field("base_url", base_url);
    }

    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to render config")?;
    println!();
    println!("{}", rendered.trim_end());

    Ok(())
}

/// Settings that are accepted but ignored in the current combination.
fn config_warnings(config: &prefetch_core::PrefetchConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.mode == ExecutionMode::Development {
        if config.cache_bust.is_some() {
            warnings.push("cache_bust is ignored in development mode".to_string());
        }
        if config.public_path.is_some() || config.site_root.is_some() {
            warnings.push(
                "site_root and public_path are ignored in development mode".to_string(),
            );
        }
    }

    if config.disable_route_prefixing && config.site_root.is_none() {
        warnings.push(
            "disable_route_prefixing is set without site_root; route info is read from /"
                .to_string(),
        );
    }

    if !config.preload.enabled && config.preload.poll_interval_ms != 300 {
        warnings.push("preload.poll_interval_ms has no effect while preload is disabled".to_string());
    }

    warnings
}

fn validate_config(ctx: &Context) -> Result<()> {
    let warnings = config_warnings(&ctx.config);

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": true,
            "warnings": warnings,
        }));
        return Ok(());
    }

    ctx.output.section("Validating configuration");
    for warning in &warnings {
        ctx.output.warn(warning);
    }
    if warnings.is_empty() {
        ctx.output.done("Configuration is valid");
    } else {
        ctx.output
            .done(&format!("Configuration is valid ({} warnings)", warnings.len()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefetch_core::PrefetchConfig;

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(config_warnings(&PrefetchConfig::default()).is_empty());
    }

    #[test]
    fn test_development_mode_warnings() {
        let config = PrefetchConfig::default()
            .with_mode(ExecutionMode::Development)
            .with_cache_bust("v=1");

        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("cache_bust"));
    }

    #[test]
    fn test_prefixing_without_site_root() {
        let mut config = PrefetchConfig::default();
        config.disable_route_prefixing = true;

        assert_eq!(config_warnings(&config).len(), 1);
    }
}
