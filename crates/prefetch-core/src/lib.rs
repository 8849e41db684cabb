//! Core abstractions for the route prefetch engine.
//!
//! This crate provides the fundamental types shared by every layer:
//! - `RouteInfo` - Per-route metadata with in-place hydration fields
//! - `get_route_path` / `path_join` / `RouteClassifier` - Path contracts
//! - `PrefetchConfig` - Engine configuration (env, TOML or JSON)
//! - `Listeners` - Subscribe/notify lists for invalidation hooks

mod config;
mod listeners;
mod path;
mod route;
mod sync;

pub use config::*;
pub use listeners::*;
pub use path::*;
pub use route::*;
pub use sync::*;
