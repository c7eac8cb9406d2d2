use std::sync::Arc;

mod builder;
mod r#impl;
#[cfg(feature = "observable")]
mod observable;

use crate::{
    config::ClientConfig,
    default_exchanges::TerminatorExchange,
    resources::{Accounts, Contacts, Entity, Organizations, ResourceClient, Users},
    ApiError, Document, Exchange
};
pub use builder::ClientBuilder;
#[cfg(feature = "observable")]
pub use observable::Observable;
use pingcrm_normalized_cache::Store;
pub use r#impl::ClientImpl;

/// The result store every client built by the application root shares.
pub type CacheStore = Store<Document, ApiError>;

/// The entry point of the library. Cloning is cheap, every clone talks to the same exchange
/// chain and store.
#[repr(transparent)]
pub struct Client<M: Exchange = TerminatorExchange>(pub Arc<ClientImpl<M>>);

impl<M: Exchange> Clone for Client<M> {
    fn clone(&self) -> Self {
        Client(self.0.clone())
    }
}

impl Client {
    pub fn builder(config: ClientConfig, store: Arc<CacheStore>) -> ClientBuilder {
        ClientBuilder::new(config, store)
    }
}

impl<M: Exchange> Client<M> {
    pub fn accounts(&self) -> Accounts<M> {
        self.resource()
    }

    pub fn users(&self) -> Users<M> {
        self.resource()
    }

    pub fn organizations(&self) -> Organizations<M> {
        self.resource()
    }

    pub fn contacts(&self) -> Contacts<M> {
        self.resource()
    }

    /// The resource client for any entity type.
    pub fn resource<E: Entity>(&self) -> ResourceClient<E, M> {
        ResourceClient::new(self.clone())
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.0.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.0.config
    }
}
