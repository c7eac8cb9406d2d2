#[cfg(feature = "default-exchanges")]
use crate::default_exchanges::FetchExchange;
use crate::{
    client::{CacheStore, Client, ClientImpl},
    config::ClientConfig,
    default_exchanges::{CacheExchange, CacheExchangeImpl, TerminatorExchange},
    types::ExtraHeaders,
    Exchange, ExchangeFactory, HeaderPair, RequestPolicy
};
#[cfg(feature = "observable")]
use parking_lot::Mutex;
#[cfg(feature = "observable")]
use std::{collections::HashMap, sync::Weak};
use std::sync::Arc;

pub struct ClientBuilder<M: Exchange = TerminatorExchange> {
    exchange: M,
    config: ClientConfig,
    store: Arc<CacheStore>,
    extra_headers: Option<ExtraHeaders>,
    request_policy: RequestPolicy
}

impl ClientBuilder<TerminatorExchange> {
    /// Start building a client. The store is shared with whoever else holds it, so several
    /// clients built from the same store see each other's results and invalidations.
    pub fn new(config: ClientConfig, store: Arc<CacheStore>) -> Self {
        ClientBuilder {
            exchange: TerminatorExchange,
            config,
            store,
            extra_headers: None,
            request_policy: RequestPolicy::CacheFirst
        }
    }
}

impl<M: Exchange> ClientBuilder<M> {
    /// Add the default exchanges to the chain. Keep in mind that exchanges are executed bottom to top, so the first one added will be the last one executed.
    #[cfg(feature = "default-exchanges")]
    pub fn with_default_exchanges(self) -> ClientBuilder<CacheExchangeImpl<FetchExchange>> {
        self.with_exchange(FetchExchange::new()).with_cache_exchange()
    }

    /// Put the cache exchange, backed by the builder's store, in front of the chain so far.
    pub fn with_cache_exchange(self) -> ClientBuilder<CacheExchangeImpl<M>> {
        let store = self.store.clone();
        self.with_exchange(CacheExchange::new(store))
    }

    /// Add an exchange to the chain. Keep in mind that exchanges are executed bottom to top, so the first one added will be the last one executed.
    pub fn with_exchange<F: ExchangeFactory<M>>(self, exchange_factory: F) -> ClientBuilder<F::Output> {
        let exchange = exchange_factory.build(self.exchange);
        ClientBuilder {
            exchange,
            config: self.config,
            store: self.store,
            extra_headers: self.extra_headers,
            request_policy: self.request_policy
        }
    }

    /// Headers to add to every request, e.g. for authentication. Called once per request.
    pub fn with_extra_headers<F: Fn() -> Vec<HeaderPair> + Send + Sync + 'static>(
        mut self,
        header_fn: F
    ) -> Self {
        self.extra_headers = Some(Arc::new(header_fn));
        self
    }

    pub fn with_request_policy(mut self, request_policy: RequestPolicy) -> Self {
        self.request_policy = request_policy;
        self
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn build(self) -> Client<M> {
        #[cfg(feature = "observable")]
        let client = Arc::new_cyclic(|weak: &Weak<ClientImpl<M>>| {
            let weak = weak.clone();
            let refetch_listener = self.store.add_refetch_listener(move |key| {
                if let Some(client) = weak.upgrade() {
                    client.rerun_query(key);
                }
            });
            ClientImpl {
                config: self.config,
                exchange: self.exchange,
                extra_headers: self.extra_headers,
                request_policy: self.request_policy,
                store: self.store,
                active_subscriptions: Arc::new(Mutex::new(HashMap::new())),
                refetch_listener
            }
        });
        #[cfg(not(feature = "observable"))]
        let client = Arc::new(ClientImpl {
            config: self.config,
            exchange: self.exchange,
            extra_headers: self.extra_headers,
            request_policy: self.request_policy,
            store: self.store
        });

        Client(client)
    }
}
