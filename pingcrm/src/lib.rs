//! A client for the PingCRM JSON:API service with a shared, tag-invalidated result cache
//! and the ability to extend its functionality through exchanges
//!
//! # Getting Started
//!
//! The application root creates the store once and hands it to every client it builds:
//!
//! ```
//! # tokio_test::block_on(async {
//! use pingcrm::{client::CacheStore, config::ClientConfig, resources::ListParams, Client};
//! use pingcrm_test::{fixtures, MockServer};
//! use std::sync::Arc;
//!
//! # let server = MockServer::new();
//! # fixtures::seed_acme(&server);
//! let config = ClientConfig::default();
//! let store = Arc::new(CacheStore::new(config.store_options()));
//! let client = Client::builder(config, store)
//! #   .with_exchange(server.clone())
//!     .with_cache_exchange()
//!     .build();
//!
//! let accounts = client.accounts().list(ListParams::limit(10)).await.unwrap();
//! assert_eq!(accounts.meta.total, 1);
//! # });
//! ```
//!
//! Outside of tests you'd use `with_default_exchanges()` instead, which talks to the API at
//! `config.api_url`.
//!
//! # Resources
//!
//! There is one resource client per entity type: accounts, users, organizations and contacts.
//! Each of them can `list`, `get`, `create`, `update` and `remove` its entities, and `watch`
//! or `watch_list` them to get a new result every time they change.
//!
//! # Exchanges
//!
//! Exchanges are like a bi-directional middleware.
//! They act on both the incoming and outgoing operations,
//! passing them on if they can't return a result themselves.
//!
//! There are two default exchanges, called in this order:
//!
//! ## CacheExchange
//!
//! Reads are served from the shared store while they're fresh. Every result is tagged with
//! the entities it contains, plus a list tag for collections. Successful mutations invalidate
//! the tags they affect, which makes the next read of any overlapping result go to the
//! network and reruns subscribed queries right away, in every client sharing the store.
//! Identical reads in flight at the same time share a single request, unless something the
//! read depends on was invalidated after it started.
//!
//! ## FetchExchange
//!
//! The fetch exchange sends the request with `reqwest` and classifies the response.
//! This should be your last exchange in the chain, as it never forwards an operation.
//!
//! # Features
//!
//! * `default-exchanges` **(default)** - Include the fetch exchange and the related builder
//! method
//! * `observable` **(default)** - Include support for `watch`/`watch_list` and all related
//! types. Includes `tokio`.

#[macro_use]
extern crate async_trait;

use types::*;

pub mod client;
pub mod config;
pub mod default_exchanges;
mod error;
pub mod resources;
pub(crate) mod types;
pub mod utils;
pub mod validation;
pub mod view;

#[cfg(feature = "observable")]
pub use client::Observable;
pub use client::{CacheStore, Client, ClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, FieldErrors};
pub use types::{
    DebugInfo, Document, ExtraHeaders, HeaderPair, QueryOptions, RequestPolicy, ResultSource
};

/// Types used by custom exchanges. Regular users probably don't need these.
pub mod exchange {
    pub use crate::types::{
        Client, Exchange, ExchangeFactory, ExchangeResult, Method, Operation, OperationMeta,
        OperationOptions, OperationResult, OperationType, Request, Response
    };
}
