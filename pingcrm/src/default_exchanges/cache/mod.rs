//! The cache exchange. Queries are answered from the shared store when possible, mutations
//! invalidate whatever they affect. The store then asks every client sharing it to refetch
//! the subscribed queries that went stale.

use crate::{
    client::CacheStore,
    exchange::{Client, Exchange, ExchangeFactory, ExchangeResult, Operation, OperationResult},
    resources::tags::{invalidated_tags, provided_tags, scope_tags},
    types::{OperationType, Response},
    ApiError, DebugInfo, Document, RequestPolicy, ResultSource
};
use std::sync::Arc;
use tracing::{debug, trace, warn};


/// Builds a [`CacheExchangeImpl`](struct.CacheExchangeImpl.html) backed by the given store.
pub struct CacheExchange {
    store: Arc<CacheStore>
}

impl CacheExchange {
    pub fn new(store: Arc<CacheStore>) -> Self {
        CacheExchange { store }
    }
}

impl<TNext: Exchange> ExchangeFactory<TNext> for CacheExchange {
    type Output = CacheExchangeImpl<TNext>;

    fn build(self, next: TNext) -> CacheExchangeImpl<TNext> {
        CacheExchangeImpl {
            store: self.store,
            next
        }
    }
}

pub struct CacheExchangeImpl<TNext: Exchange> {
    store: Arc<CacheStore>,
    next: TNext
}

impl<TNext: Exchange> CacheExchangeImpl<TNext> {
    async fn run_query<C: Client>(&self, operation: Operation, client: C) -> ExchangeResult {
        let key = operation.key;
        let meta = operation.meta.clone();
        let request_policy = operation.options.request_policy;

        if request_policy == RequestPolicy::CacheOnly {
            let data = self.store.get(key).ok_or(ApiError::NotCached)?;
            trace!(key, "serving cache-only query");
            return Ok(OperationResult {
                key,
                meta,
                response: Response {
                    debug_info: Some(DebugInfo {
                        source: ResultSource::Cache,
                        did_dedup: false
                    }),
                    data
                }
            });
        }

        let kind = meta.kind;
        let action = meta.action.clone();
        let scope = scope_tags(kind, &action);
        let provides = move |data: &Document| provided_tags(kind, &action, data);
        let next = &self.next;
        let loader = move || async move {
            next.run(operation, client)
                .await
                .map(|result| result.response.data)
        };

        let served = if request_policy == RequestPolicy::NetworkOnly {
            self.store.refetch(key, scope, provides, loader).await
        } else {
            self.store.fetch_or_serve(key, scope, provides, loader).await
        };
        let served = served.map_err(|e| {
            warn!(key, error = %e, "query failed");
            e
        })?;

        if served.invalidated_in_flight {
            debug!(key, "result was invalidated while loading");
        }

        Ok(OperationResult {
            key,
            meta,
            response: Response {
                debug_info: Some(served.debug_info),
                data: served.data
            }
        })
    }

    async fn run_mutation<C: Client>(&self, operation: Operation, client: C) -> ExchangeResult {
        let kind = operation.meta.kind;
        let action = operation.meta.action.clone();
        let result = self.next.run(operation, client).await?;

        let tags = invalidated_tags(kind, &action);
        let stale = self.store.invalidate(&tags);
        debug!(tags = %tags, refetch = stale.len(), "mutation invalidated cached results");
        Ok(result)
    }
}

#[async_trait]
impl<TNext: Exchange> Exchange for CacheExchangeImpl<TNext> {
    async fn run<C: Client>(&self, operation: Operation, client: C) -> ExchangeResult {
        match operation.meta.operation_type {
            OperationType::Query => self.run_query(operation, client).await,
            OperationType::Mutation => self.run_mutation(operation, client).await
        }
    }
}
