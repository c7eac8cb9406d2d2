use crate::{
    exchange::{Client, Method, Operation, OperationOptions, OperationResult, Request},
    types::Response,
    ApiError, DebugInfo, Exchange, ExchangeFactory, ExchangeResult, HeaderPair, ResultSource
};
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// The default fetch exchange
///
/// Sends the operation's request with `reqwest` and classifies the response. This should be the
/// last exchange in the chain, as it never forwards an operation.
#[derive(Clone, Default)]
pub struct FetchExchange {
    client: reqwest::Client
}

impl FetchExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client, e.g. one with a proxy or custom TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        FetchExchange { client }
    }

    async fn fetch(
        &self,
        extra_headers: Vec<HeaderPair>,
        options: &OperationOptions,
        request: &Request
    ) -> Result<Value, ApiError> {
        let url = request_url(&options.url, &request.path);
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &url)
            .timeout(options.timeout)
            .header(ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        for HeaderPair(key, value) in extra_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        trace!(%url, status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        parse_body(&body)
    }
}

impl<TNext: Exchange> ExchangeFactory<TNext> for FetchExchange {
    type Output = FetchExchange;

    fn build(self, _next: TNext) -> Self::Output {
        self
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE
    }
}

fn request_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Empty bodies (e.g. a 204 from a delete) are `null`.
fn parse_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}

#[async_trait]
impl Exchange for FetchExchange {
    async fn run<C: Client>(&self, operation: Operation, _client: C) -> ExchangeResult {
        let extra_headers = if let Some(ref extra_headers) = operation.options.extra_headers {
            extra_headers()
        } else {
            Vec::new()
        };
        debug!(
            method = %operation.request.method,
            path = %operation.request.path,
            "sending request"
        );

        let data = self
            .fetch(extra_headers, &operation.options, &operation.request)
            .await?;

        Ok(OperationResult {
            key: operation.key,
            meta: operation.meta,
            response: Response {
                debug_info: Some(DebugInfo {
                    source: ResultSource::Network,
                    did_dedup: false
                }),
                data: Arc::new(data)
            }
        })
    }
}
