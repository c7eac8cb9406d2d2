//! Test support for the pingcrm client: an in-memory backend that speaks the same JSON:API
//! dialect as the real server, plus fixtures.
//!
//! ```
//! # tokio_test::block_on(async {
//! use pingcrm::resources::ListParams;
//! use pingcrm_test::{client, fixtures, MockServer};
//!
//! let server = MockServer::new();
//! fixtures::seed_acme(&server);
//!
//! let accounts = client(&server).accounts().list(ListParams::default()).await.unwrap();
//! assert_eq!(accounts.data[0].attributes.name, "Acme");
//! # });
//! ```

#[macro_use]
extern crate async_trait;

pub mod fixtures;
mod server;

use pingcrm::{
    client::CacheStore, config::ClientConfig, default_exchanges::CacheExchangeImpl, Client
};
pub use server::{Call, MockServer};
use std::sync::Arc;

/// A client as the application would build it, with the network replaced by `server`.
pub type TestClient = Client<CacheExchangeImpl<MockServer>>;

pub fn client(server: &MockServer) -> TestClient {
    client_with_config(server, ClientConfig::default())
}

pub fn client_with_config(server: &MockServer, config: ClientConfig) -> TestClient {
    let store = Arc::new(CacheStore::new(config.store_options()));
    client_with_store(server, config, store)
}

/// Build a client on an existing store, e.g. to check that two clients share results.
pub fn client_with_store(
    server: &MockServer,
    config: ClientConfig,
    store: Arc<CacheStore>
) -> TestClient {
    Client::builder(config, store)
        .with_exchange(server.clone())
        .with_cache_exchange()
        .build()
}
