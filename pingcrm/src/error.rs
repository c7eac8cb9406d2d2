use serde_json::Value;
use std::collections::BTreeMap;

/// Field name (as used on the wire) to a human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Everything that can go wrong when talking to the API.
///
/// Errors are `Clone` because a single network load may answer several callers at once.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never got a response: connection failure, timeout, etc.
    #[error("network error: {0}")]
    Network(String),
    #[error("not found")]
    NotFound,
    /// The server rejected the input with per-field messages.
    #[error("validation failed: {}", join_fields(.field_errors))]
    Validation { field_errors: FieldErrors },
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    /// A successful response whose body didn't match the expected envelope.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// A cache-only request found nothing usable in the cache.
    #[error("no cached result available")]
    NotCached,
    #[error("unexpected end of exchange chain")]
    UnexpectedEndOfChain
}

fn join_fields(field_errors: &FieldErrors) -> String {
    field_errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

impl ApiError {
    /// Classify a non-2xx response.
    ///
    /// A 4xx other than 404 counts as a validation failure if the body carries either an
    /// `errors` object (field to message, or field to list of messages) or a `detail` array
    /// of `{loc, msg}` objects. Anything else ends up as `Server`.
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 404 {
            return ApiError::NotFound;
        }
        if (400..500).contains(&status) {
            if let Some(field_errors) = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|body| structured_field_errors(&body))
            {
                return ApiError::Validation { field_errors };
            }
        }
        ApiError::Server {
            status,
            body: body.to_string()
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation { field_errors } => Some(field_errors),
            _ => None
        }
    }

    /// The server's `detail` message, if the error body had a plain string one.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::Server { body, .. } => serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|body| body.get("detail").and_then(Value::as_str).map(String::from)),
            _ => None
        }
    }
}

fn structured_field_errors(body: &Value) -> Option<FieldErrors> {
    let mut field_errors = FieldErrors::new();

    if let Some(errors) = body.get("errors").and_then(Value::as_object) {
        for (field, message) in errors {
            let message = match message {
                Value::String(message) => Some(message.clone()),
                Value::Array(messages) => messages.iter().find_map(Value::as_str).map(String::from),
                _ => None
            };
            if let Some(message) = message {
                field_errors.insert(field.clone(), message);
            }
        }
    } else if let Some(details) = body.get("detail").and_then(Value::as_array) {
        for detail in details {
            let field = detail
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .map(|field| match field {
                    Value::String(field) => field.clone(),
                    other => other.to_string()
                });
            let message = detail.get("msg").and_then(Value::as_str);
            if let (Some(field), Some(message)) = (field, message) {
                field_errors.entry(field).or_insert_with(|| message.to_string());
            }
        }
    }

    if field_errors.is_empty() {
        None
    } else {
        Some(field_errors)
    }
}
