use crate::{resources::ResourceKind, ApiError};
pub use pingcrm_normalized_cache::{DebugInfo, ResultSource};
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};

/// A decoded response body, shared between the cache and every caller that asked for it.
pub type Document = Arc<Value>;

pub type ExchangeResult = Result<OperationResult, ApiError>;

/// Exchanges are the building blocks of the client. Each one gets an operation and either
/// answers it itself or forwards it to the next exchange in the chain.
#[async_trait]
pub trait Exchange: Send + Sync + 'static {
    async fn run<C: Client>(&self, operation: Operation, client: C) -> ExchangeResult;
}

/// Builds an exchange around the next one in the chain.
pub trait ExchangeFactory<TNext: Exchange> {
    type Output: Exchange;

    fn build(self, next: TNext) -> Self::Output;
}

/// The handle exchanges get to talk back to the client.
pub trait Client: Clone + Send + Sync + 'static {
    /// Rerun a subscribed query in the background and push the result to its subscribers.
    fn rerun_query(&self, query_key: u64);
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum OperationType {
    Query,
    Mutation
}

/// Decides how a query uses the cache. Mutations ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPolicy {
    /// Serve fresh cached results, only going to the network on a miss.
    CacheFirst,
    /// Only ever serve from the cache. A miss is an `ApiError::NotCached`.
    CacheOnly,
    /// Always go to the network. The result is still written to the cache.
    NetworkOnly
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderPair(pub String, pub String);

pub type ExtraHeaders = Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE"
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The HTTP part of an operation, relative to the API base URL.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path below the base URL, e.g. `/accounts/1`.
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperationMeta {
    pub operation_type: OperationType,
    pub kind: ResourceKind,
    pub action: crate::resources::Action
}

#[derive(Clone)]
pub struct OperationOptions {
    pub url: String,
    pub extra_headers: Option<ExtraHeaders>,
    pub request_policy: RequestPolicy,
    pub timeout: Duration
}

impl fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOptions")
            .field("url", &self.url)
            .field("extra_headers", &self.extra_headers.is_some())
            .field("request_policy", &self.request_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Operation {
    /// The request fingerprint. Identical reads share a key.
    pub key: u64,
    pub meta: OperationMeta,
    pub request: Request,
    pub options: OperationOptions
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub debug_info: Option<DebugInfo>,
    pub data: Document
}

#[derive(Clone, Debug)]
pub struct OperationResult {
    pub key: u64,
    pub meta: OperationMeta,
    pub response: Response
}

/// Per-call overrides for the client defaults.
#[derive(Default, Clone)]
pub struct QueryOptions {
    pub url: Option<String>,
    pub extra_headers: Option<ExtraHeaders>,
    pub request_policy: Option<RequestPolicy>,
    pub timeout: Option<Duration>
}

impl QueryOptions {
    pub fn with_request_policy(request_policy: RequestPolicy) -> Self {
        QueryOptions {
            request_policy: Some(request_policy),
            ..QueryOptions::default()
        }
    }
}
