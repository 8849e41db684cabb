//! Route prefetching engine.
//!
//! This crate provides:
//! - `PrefetchEngine` - Route metadata lookup, shared-data hydration and
//!   template preloading over a deduplicated, bounded request path
//! - `TemplateRegistry` - Templates by id and their path bindings
//! - `DevReloadListener` - Dev-server driven cache invalidation
//! - `Preloader` - Background prefetching of visible links
//!
//! # Example
//!
//! ```ignore
//! use prefetch_engine::{PrefetchConfig, PrefetchEngine, PrefetchOptions};
//! use prefetch_data::ReqwestTransport;
//!
//! let engine = PrefetchEngine::builder(PrefetchConfig::from_env()?)
//!     .transport(ReqwestTransport::new().with_base_url("https://example.com"))
//!     .build()?;
//!
//! engine.prefetch("/blog/post", PrefetchOptions::new().with_priority(true)).await?;
//! ```

mod dev_reload;
mod engine;
mod error;
mod invalidation;
mod orchestrator;
mod preloader;
mod request;
mod route_info;
mod shared_data;
mod stats;
mod template;

pub use dev_reload::*;
pub use engine::*;
pub use error::*;
pub use orchestrator::*;
pub use preloader::*;
pub use route_info::*;
pub use stats::*;
pub use template::*;

pub use prefetch_cache::{CacheSnapshot, CacheStatus, RouteStore};
pub use prefetch_core::{
    ExecutionMode, PrefetchConfig, PriorityDedup, RouteInfo, SharedData, SharedValue,
    SubscriptionId,
};
pub use prefetch_executor::{PoolHold, RequestPool};
