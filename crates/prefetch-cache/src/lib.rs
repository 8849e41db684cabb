//! Caching infrastructure for the route prefetch engine.
//!
//! This crate provides:
//! - `RouteStore` - Route metadata, errored paths and shared-data caches
//! - `InflightTable` - One live fetch per key, joinable by later callers
//! - `CacheStatus` / `CacheSnapshot` - Diagnostics for cached state

mod inflight;
mod store;

pub use inflight::*;
pub use store::*;
