use crate::{
    client::ClientImpl,
    resources::decode,
    types::{RequestPolicy, Response},
    ApiError, Exchange, Operation
};
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::Context,
    Stream
};
use serde::de::DeserializeOwned;
use stable_vec::StableVec;
use std::{future::Future, marker::PhantomData, pin::Pin, sync::Arc, task::Poll};
use tokio::runtime::Handle;
use tracing::{trace, warn};

type QueryResult = Result<Response, ApiError>;
type RerunFuture = Pin<Box<dyn Future<Output = QueryResult> + Send>>;

pub(crate) struct Subscription {
    pub(crate) listeners: StableVec<UnboundedSender<QueryResult>>,
    // Captures the operation so it can be rerun by key alone
    pub(crate) rerun: Arc<dyn Fn() -> RerunFuture + Send + Sync>
}

/// A stream of results for a subscribed query.
///
/// The subscription, and with it the store's interest in the result, ends when the
/// observable is dropped.
pub struct Observable<T, M: Exchange> {
    inner: UnboundedReceiver<QueryResult>,
    client: Arc<ClientImpl<M>>,
    key: u64,
    index: usize,
    t: PhantomData<fn() -> T>
}

impl<T, M: Exchange> Observable<T, M> {
    pub(crate) fn new(
        key: u64,
        inner: UnboundedReceiver<QueryResult>,
        client: Arc<ClientImpl<M>>,
        index: usize
    ) -> Self {
        Observable {
            inner,
            client,
            key,
            index,
            t: PhantomData
        }
    }

    /// The fingerprint of the watched query.
    pub fn key(&self) -> u64 {
        self.key
    }
}

impl<T: DeserializeOwned, M: Exchange> Stream for Observable<T, M> {
    type Item = Result<T, ApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = &mut self.get_mut().inner;
        match Pin::new(inner).poll_next(cx) {
            Poll::Ready(Some(result)) => {
                Poll::Ready(Some(result.and_then(|response| decode(&response.data))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending
        }
    }
}

impl<T, M: Exchange> Drop for Observable<T, M> {
    fn drop(&mut self) {
        self.client.clear_observable(self.key, self.index)
    }
}

pub(crate) async fn subscribe<T: DeserializeOwned, M: Exchange>(
    client: &Arc<ClientImpl<M>>,
    operation: Operation
) -> Observable<T, M> {
    let (sender, receiver) = mpsc::unbounded();
    let key = operation.key;
    client.store.subscribe(key);

    let index = {
        let mut subscriptions = client.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get_mut(&key) {
            subscription.listeners.push(sender.clone())
        } else {
            let mut rerun_operation = operation.clone();
            // A rerun has to go past the stale entry that triggered it
            if rerun_operation.options.request_policy == RequestPolicy::CacheOnly {
                rerun_operation.options.request_policy = RequestPolicy::CacheFirst;
            }
            let rerun_client = client.clone();
            let mut listeners = StableVec::new();
            let index = listeners.push(sender.clone());
            let subscription = Subscription {
                listeners,
                rerun: Arc::new(move || -> RerunFuture {
                    let client = rerun_client.clone();
                    let operation = rerun_operation.clone();
                    Box::pin(async move { client.execute_request_operation(operation).await })
                })
            };
            subscriptions.insert(key, subscription);
            index
        }
    };
    let observable = Observable::new(key, receiver, client.clone(), index);

    let result = client.execute_request_operation(operation).await;
    // The receiving end is owned by `observable`, so this can't fail.
    let _ = sender.unbounded_send(result);
    observable
}

pub(crate) fn rerun_query<M: Exchange>(client: &Arc<ClientImpl<M>>, key: u64) {
    let rerun = {
        let subscriptions = client.active_subscriptions.lock();
        subscriptions.get(&key).map(|subscription| subscription.rerun.clone())
    };
    let rerun = match rerun {
        Some(rerun) => rerun,
        None => {
            trace!(key, "no active subscription to rerun");
            return;
        }
    };
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!(key, "not inside a tokio runtime, can't rerun subscribed query");
            return;
        }
    };

    let client = client.clone();
    handle.spawn(async move {
        let result = rerun().await;
        let subscriptions = client.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get(&key) {
            trace!(key, listeners = subscription.listeners.num_elements(), "pushing rerun result");
            for listener in subscription.listeners.values() {
                let _ = listener.unbounded_send(result.clone());
            }
        }
    });
}
