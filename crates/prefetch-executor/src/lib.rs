//! Bounded background request execution.
//!
//! This crate provides:
//! - `RequestPool` - Concurrency-limited, FIFO task admission
//! - `PoolHold` - Reference-counted pause held by priority work

mod pool;

pub use pool::*;
