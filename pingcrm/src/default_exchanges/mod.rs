//! This module contains the default exchanges.
//! Note that the fetch exchange requires the `default-exchanges` feature.

use crate::{
    exchange::Client,
    types::{Exchange, Operation},
    ApiError, ExchangeResult
};

mod cache;
#[cfg(feature = "default-exchanges")]
mod fetch;

pub use cache::{CacheExchange, CacheExchangeImpl};
#[cfg(feature = "default-exchanges")]
pub use fetch::FetchExchange;

/// The terminating exchange.
/// This will always be the last exchange in the chain and will simply return an error if called.
pub struct TerminatorExchange;

#[async_trait]
impl Exchange for TerminatorExchange {
    async fn run<C: Client>(&self, _operation: Operation, _client: C) -> ExchangeResult {
        Err(ApiError::UnexpectedEndOfChain)
    }
}
