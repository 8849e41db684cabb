//! Data access layer for route prefetching.
//!
//! This crate provides:
//! - `Transport` - Read-only JSON transport seam
//! - `FetchError` - Transport failures, cloneable for shared waiters
//! - `AssetLocator` - Live and published request locations
//! - `ReqwestTransport` - HTTP transport (`reqwest` feature)

mod client;
mod locator;

pub use client::*;
pub use locator::*;
