//! Request issuance under the priority and deduplication policy.

use std::sync::Arc;

use futures::future::FutureExt;
use prefetch_cache::{InflightHandle, InflightTable};
use prefetch_core::{PriorityDedup, SharedValue};
use prefetch_data::FetchError;
use tracing::debug;

use crate::engine::PrefetchEngine;

/// Outcome of one issued request.
///
/// `handle` is set when the caller waited on a table entry it must settle
/// after recording the result. `fresh` is set when this call put a new
/// request on the wire.
pub(crate) struct Issued<E> {
    pub(crate) result: Result<SharedValue, E>,
    pub(crate) handle: Option<InflightHandle<SharedValue, E>>,
    pub(crate) fresh: bool,
}

impl<E: Clone> Issued<E> {
    /// Remove the table entry this request waited on.
    pub(crate) fn settle(&self, table: &InflightTable<SharedValue, E>) {
        if let Some(handle) = &self.handle {
            table.settle(handle);
        }
    }
}

impl PrefetchEngine {
    /// GET `url` for `key`.
    ///
    /// Priority requests go straight to the transport and never create table
    /// entries. Other requests join the live entry for `key` or create one,
    /// running through the pool when `pooled` is set.
    ///
    /// `on_error` turns a transport error into the table's failure type. It
    /// runs once per request, before any waiter observes the failure.
    pub(crate) async fn issue<E, F>(
        &self,
        table: &InflightTable<SharedValue, E>,
        key: &str,
        url: String,
        priority: bool,
        pooled: bool,
        on_error: F,
    ) -> Issued<E>
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce(FetchError) -> E + Send + 'static,
    {
        let transport = Arc::clone(&self.inner.transport);

        if priority {
            // A queued entry may sit behind the pause this caller holds.
            if self.inner.config.priority_dedup == PriorityDedup::JoinInflight {
                if let Some(handle) = table.join_started(key) {
                    debug!(key, "priority request joined inflight fetch");
                    return Issued {
                        result: handle.wait().await,
                        handle: None,
                        fresh: false,
                    };
                }
            }

            debug!(key, url = %url, "issuing priority request");
            let result = transport.get_json(&url).await.map(Arc::new).map_err(on_error);
            return Issued {
                result,
                handle: None,
                fresh: true,
            };
        }

        let pool = self.inner.pool.clone();
        let (handle, created) = table.join_or_start(key, move |started| {
            let fetch = async move {
                started.mark();
                transport.get_json(&url).await.map(Arc::new)
            };
            let fetch = if pooled {
                pool.add(move || fetch).boxed()
            } else {
                fetch.boxed()
            };
            async move { fetch.await.map_err(on_error) }.boxed()
        });

        if created {
            debug!(key, pooled, "queued request");
        } else {
            debug!(key, "joined inflight request");
        }

        Issued {
            result: handle.wait().await,
            handle: Some(handle),
            fresh: created,
        }
    }
}
