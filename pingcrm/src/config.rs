use pingcrm_normalized_cache::StoreOptions;
use std::{env, time::Duration};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String }
}

/// Settings for the client and the store it's built with.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing slash.
    pub api_url: String,
    /// Upper bound for every HTTP request. Expiry is reported as a network error.
    pub request_timeout: Duration,
    /// How long cached results nobody is subscribed to stay around.
    pub gc_grace: Duration,
    /// Page size used by list requests that don't specify a limit.
    pub default_page_size: u32
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            gc_grace: Duration::from_secs(60),
            default_page_size: 10
        }
    }
}

impl ClientConfig {
    /// Read the config from `PINGCRM_*` environment variables, falling back to the defaults
    /// for anything that isn't set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>
    {
        let mut config = ClientConfig::default();
        if let Some(api_url) = lookup("PINGCRM_API_URL") {
            config.api_url = api_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(ms) = lookup("PINGCRM_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(parse_number("request_timeout", &ms)?);
        }
        if let Some(ms) = lookup("PINGCRM_GC_GRACE_MS") {
            config.gc_grace = Duration::from_millis(parse_number("gc_grace", &ms)?);
        }
        if let Some(size) = lookup("PINGCRM_PAGE_SIZE") {
            config.default_page_size = parse_number("default_page_size", &size)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Options for the store a client built from this config should share.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            gc_grace: self.gc_grace
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_url",
                reason: "must not be empty".to_string()
            });
        }
        if let Err(e) = Url::parse(&self.api_url) {
            return Err(ConfigError::InvalidValue {
                field: "api_url",
                reason: e.to_string()
            });
        }
        if self.request_timeout == Duration::from_millis(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout",
                reason: "must be greater than zero".to_string()
            });
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_page_size",
                reason: "must be greater than zero".to_string()
            });
        }
        Ok(())
    }
}

fn parse_number<N: std::str::FromStr>(field: &'static str, value: &str) -> Result<N, ConfigError>
where
    N::Err: std::fmt::Display
{
    value
        .trim()
        .parse()
        .map_err(|e: N::Err| ConfigError::InvalidValue {
            field,
            reason: format!("{:?} is not a number: {}", value, e)
        })
}
