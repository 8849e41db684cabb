//! Inspect a single route.

use anyhow::{bail, Result};
use prefetch_engine::{FetchOptions, RouteLookup};
use serde_json::{json, Value};

use super::InspectArgs;
use crate::context::Context;
use crate::output::status_badge;

/// Run the inspect command.
pub async fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let key = engine.normalize(&args.path);

    ctx.output.debug(&format!("Resolving {} as {}", args.path, key));
    let lookup = engine.lookup_route_info(&args.path, FetchOptions::priority()).await;

    if args.data {
        engine.prefetch_data(&args.path, FetchOptions::priority()).await;
    }

    let Some(info) = lookup.route_info().cloned() else {
        if ctx.output.is_json() {
            ctx.output.json(&json!({ "path": args.path, "key": key, "status": lookup.label() }));
        }
        match lookup {
            RouteLookup::Skipped => bail!("{} is not a prefetchable route", args.path),
            _ => bail!("{} could not be resolved", args.path),
        }
    };

    let shared: Option<serde_json::Map<String, Value>> = info.shared_data().map(|props| {
        props
            .into_iter()
            .map(|(prop, value)| (prop, value.map_or(Value::Null, |v| (*v).clone())))
            .collect()
    });

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "path": args.path,
            "key": key,
            "status": lookup.label(),
            "routePath": info.path(),
            "template": info.template(),
            "sharedHashesByProp": info.shared_hashes_by_prop(),
            "data": info.data(),
            "sharedData": shared,
        }));
        return Ok(());
    }

    ctx.output.section(&format!("Route {}", key));
    ctx.output.field("status", &status_badge(lookup.label()));
    ctx.output.field("path", info.path());
    ctx.output.field("template", info.template().unwrap_or("-"));

    let mut hashes: Vec<_> = info.shared_hashes_by_prop().iter().collect();
    hashes.sort();
    if !hashes.is_empty() {
        ctx.output.note("Shared data:");
        for (prop, hash) in hashes {
            let state = match &shared {
                Some(props) if props.get(prop).map_or(false, |v| !v.is_null()) => Some("loaded"),
                Some(_) => Some("unavailable"),
                None => None,
            };
            ctx.output.prop(prop, hash, state);
        }
    }

    if let Some(data) = info.data() {
        ctx.output.note("Route data:");
        println!("{}", serde_json::to_string_pretty(data)?);
    }

    if lookup.is_fallback() {
        ctx.output.warn(&format!("{} failed; showing the not-found route", args.path));
    }

    Ok(())
}
