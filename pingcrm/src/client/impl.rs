use crate::{
    client::CacheStore,
    config::ClientConfig,
    resources::{Action, ResourceKind},
    types::{ExtraHeaders, OperationMeta, OperationOptions, Request, Response},
    utils::fingerprint,
    ApiError, Exchange, Operation, QueryOptions, RequestPolicy
};
#[cfg(feature = "observable")]
use crate::client::observable::{Observable, Subscription};
#[cfg(feature = "observable")]
use parking_lot::Mutex;
#[cfg(feature = "observable")]
use pingcrm_normalized_cache::ListenerId;
#[cfg(feature = "observable")]
use serde::de::DeserializeOwned;
#[cfg(feature = "observable")]
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct ClientImpl<M: Exchange> {
    pub(crate) config: ClientConfig,
    pub(crate) exchange: M,
    pub(crate) extra_headers: Option<ExtraHeaders>,
    pub(crate) request_policy: RequestPolicy,
    pub(crate) store: Arc<CacheStore>,
    #[cfg(feature = "observable")]
    pub(crate) active_subscriptions: Arc<Mutex<HashMap<u64, Subscription>>>,
    /// Reruns this client's subscriptions whenever the shared store asks for a refetch, no
    /// matter which client caused it.
    #[cfg(feature = "observable")]
    pub(crate) refetch_listener: ListenerId
}

#[cfg(feature = "observable")]
impl<M: Exchange> Drop for ClientImpl<M> {
    fn drop(&mut self) {
        self.store.remove_refetch_listener(self.refetch_listener);
    }
}

impl<M: Exchange> ClientImpl<M> {
    #[cfg(feature = "observable")]
    pub(crate) fn clear_observable(&self, key: u64, index: usize) {
        let mut subscriptions = self.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get_mut(&key) {
            subscription.listeners.remove(index);
            if subscription.listeners.is_empty() {
                subscriptions.remove(&key);
            }
        }
        self.store.unsubscribe(key);
    }

    pub(crate) async fn execute_request_operation(
        self: &Arc<Self>,
        operation: Operation
    ) -> Result<Response, ApiError> {
        debug!(
            key = operation.key,
            kind = %operation.meta.kind,
            method = %operation.request.method,
            path = %operation.request.path,
            "executing operation"
        );
        self.exchange
            .run(operation, self.clone())
            .await
            .map(|operation_result| operation_result.response)
    }

    #[cfg(feature = "observable")]
    pub fn rerun_query(self: &Arc<Self>, key: u64) {
        super::observable::rerun_query(self, key);
    }

    #[cfg(not(feature = "observable"))]
    pub fn rerun_query(self: &Arc<Self>, _key: u64) {}

    /// Run `operation` and keep listening for new results. The first item of the stream is
    /// the current result, the following ones are pushed every time the query gets rerun.
    #[cfg(feature = "observable")]
    pub async fn subscribe<T: DeserializeOwned>(
        self: &Arc<Self>,
        operation: Operation
    ) -> Observable<T, M> {
        super::observable::subscribe(self, operation).await
    }

    pub(crate) fn create_request_operation(
        &self,
        kind: ResourceKind,
        action: Action,
        request: Request,
        options: QueryOptions
    ) -> Operation {
        let extra_headers = options
            .extra_headers
            .or_else(|| self.extra_headers.clone());

        Operation {
            key: fingerprint(kind, &action),
            meta: OperationMeta {
                operation_type: action.operation_type(),
                kind,
                action
            },
            request,
            options: OperationOptions {
                url: options.url.unwrap_or_else(|| self.config.api_url.clone()),
                extra_headers,
                request_policy: options.request_policy.unwrap_or(self.request_policy),
                timeout: options.timeout.unwrap_or(self.config.request_timeout)
            }
        }
    }
}

impl<M: Exchange> crate::exchange::Client for Arc<ClientImpl<M>> {
    fn rerun_query(&self, query_key: u64) {
        ClientImpl::rerun_query(self, query_key)
    }
}
