//! Warm a site's route caches.

use anyhow::{bail, Result};
use futures::future::join_all;
use prefetch_engine::{CacheSnapshot, PrefetchEngine, PrefetchOptions, StatsSnapshot};
use serde::Serialize;

use super::WarmArgs;
use crate::context::Context;
use crate::output::status_badge;

#[derive(Debug, Serialize)]
struct WarmedRoute {
    path: String,
    key: String,
    status: String,
    hydrated: bool,
    missing_props: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct WarmReport {
    routes: Vec<WarmedRoute>,
    stats: StatsSnapshot,
    cache: CacheSnapshot,
}

/// Run the warm command.
pub async fn run(args: WarmArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let options = PrefetchOptions::new()
        .with_kind(args.kind)
        .with_priority(args.priority);

    ctx.output.debug(&format!(
        "Prefetching {} route(s), type={}, priority={}",
        args.paths.len(),
        args.kind,
        args.priority
    ));

    let pb = ctx.output.warm_progress(args.paths.len() as u64);
    let warmed = join_all(args.paths.iter().map(|path| {
        let engine = &engine;
        let pb = &pb;
        async move {
            let outcome = engine.prefetch(path, options).await;
            pb.inc(1);
            describe(engine, path, outcome.err().map(|e| e.to_string()))
        }
    }))
    .await;
    pb.finish_and_clear();

    let report = WarmReport {
        routes: warmed,
        stats: engine.stats().snapshot(),
        cache: engine.snapshot(),
    };
    let failed = report
        .routes
        .iter()
        .filter(|r| r.status == "errored" || r.error.is_some())
        .count();

    if ctx.output.is_json() {
        ctx.output.json(&report);
    } else {
        print_report(&report, ctx);
    }

    if failed == report.routes.len() {
        bail!("No route could be prefetched");
    }
    Ok(())
}

fn describe(engine: &PrefetchEngine, path: &str, error: Option<String>) -> WarmedRoute {
    let key = engine.normalize(path);
    let status = engine.store().status(&key).to_string().to_lowercase();
    let info = engine.store().route_info(&key);

    let hydrated = info.as_ref().map_or(false, |info| info.is_hydrated());
    let mut missing_props: Vec<String> = info
        .and_then(|info| info.shared_data())
        .map(|props| {
            props
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(prop, _)| prop)
                .collect()
        })
        .unwrap_or_default();
    missing_props.sort();

    WarmedRoute {
        path: path.to_string(),
        key,
        status,
        hydrated,
        missing_props,
        error,
    }
}

fn print_report(report: &WarmReport, ctx: &Context) {
    ctx.output.section("Prefetched routes");
    ctx.output.route_table_header();
    for route in &report.routes {
        let hydrated = if route.hydrated { "yes" } else { "no" };
        let status = status_badge(&route.status);
        ctx.output.route_row(&route.key, &status, hydrated);
        for prop in &route.missing_props {
            ctx.output.warn(&format!("{}: shared prop '{}' unavailable", route.key, prop));
        }
        if let Some(error) = &route.error {
            ctx.output.warn(&format!("{}: {}", route.key, error));
        }
    }

    println!();
    ctx.output.field("route requests", &report.stats.route_requests.to_string());
    ctx.output.field("shared requests", &report.stats.shared_requests.to_string());
    ctx.output.field("fallbacks", &report.stats.fallbacks.to_string());
    ctx.output.field("failures", &report.stats.failures.to_string());
    ctx.output.field("cached hashes", &report.cache.shared_hashes.len().to_string());

    if report.cache.errored.is_empty() {
        ctx.output.done("All routes resolved");
    }
}
