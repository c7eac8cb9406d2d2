use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use pingcrm::{
    exchange::{
        Client, Exchange, ExchangeFactory, ExchangeResult, Method, Operation, OperationResult,
        Request, Response
    },
    resources::ResourceKind,
    ApiError, DebugInfo, ResultSource
};
use serde_json::{json, Map, Value};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
    time::Duration
};

/// A request as the server received it.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>
}

struct Scripted {
    method: Method,
    path: String,
    status: u16,
    body: String
}

struct Row {
    attributes: Map<String, Value>,
    organization_id: Option<String>
}

#[derive(Default)]
struct State {
    tables: HashMap<ResourceKind, BTreeMap<u64, Row>>,
    next_id: u64,
    calls: Vec<Call>,
    scripted: VecDeque<Scripted>,
    latency: Option<Duration>
}

/// An in-memory backend. Use it as the last exchange of a client.
///
/// Clones share their state, so a test can keep a handle to inspect the calls a client made.
#[derive(Clone, Default)]
pub struct MockServer(Arc<Mutex<State>>);

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, to keep requests in flight long enough to overlap.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.0.lock().latency = Some(latency);
        self
    }

    /// Store an entity directly, without a request. Returns its id.
    pub fn insert(&self, kind: ResourceKind, attributes: Value) -> String {
        let mut state = self.0.lock();
        let attributes = match attributes {
            Value::Object(attributes) => attributes,
            _ => Map::new()
        };
        state.insert(kind, attributes).to_string()
    }

    /// The stored attributes of an entity.
    pub fn attributes(&self, kind: ResourceKind, id: &str) -> Option<Value> {
        let id = id.parse::<u64>().ok()?;
        let state = self.0.lock();
        state
            .tables
            .get(&kind)
            .and_then(|table| table.get(&id))
            .map(|row| Value::Object(row.attributes.clone()))
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.0.lock().tables.get(&kind).map_or(0, BTreeMap::len)
    }

    /// Answer the next `method` request to `path` with the given status and body instead of
    /// handling it.
    pub fn respond_once<B: Into<String>>(&self, method: Method, path: &str, status: u16, body: B) {
        self.0.lock().scripted.push_back(Scripted {
            method,
            path: path.to_string(),
            status,
            body: body.into()
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().calls.clone()
    }

    /// How many `method` requests were made to `path`, ignoring query strings.
    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.0
            .lock()
            .calls
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn reset_calls(&self) {
        self.0.lock().calls.clear();
    }

    fn handle(&self, request: &Request) -> Result<Value, ApiError> {
        let mut state = self.0.lock();

        let scripted = state
            .scripted
            .iter()
            .position(|scripted| scripted.method == request.method && scripted.path == request.path)
            .and_then(|position| state.scripted.remove(position));
        if let Some(scripted) = scripted {
            return if (200..300).contains(&scripted.status) {
                if scripted.body.trim().is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(serde_json::from_str(&scripted.body)?)
                }
            } else {
                Err(ApiError::from_response(scripted.status, &scripted.body))
            };
        }

        let (kind, id) = parse_path(&request.path).ok_or_else(not_found)?;
        let attributes = || {
            request
                .body
                .as_ref()
                .and_then(|body| body.pointer("/data/attributes"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default()
        };
        match (request.method, id) {
            (Method::Get, None) => Ok(state.list(kind, &request.query)),
            (Method::Get, Some(id)) => state.get(kind, id),
            (Method::Post, None) => {
                let id = state.insert(kind, attributes());
                state.get(kind, id)
            }
            (Method::Patch, Some(id)) => state.update(kind, id, attributes()),
            (Method::Delete, Some(id)) => state.remove(kind, id),
            _ => Err(ApiError::from_response(
                405,
                r#"{"detail":"Method Not Allowed"}"#
            ))
        }
    }
}

fn not_found() -> ApiError {
    ApiError::from_response(404, r#"{"detail":"Not Found"}"#)
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn parse_path(path: &str) -> Option<(ResourceKind, Option<u64>)> {
    let mut segments = path.trim_matches('/').split('/');
    let kind = segments.next()?.parse().ok()?;
    let id = match segments.next() {
        Some(id) => Some(id.parse().ok()?),
        None => None
    };
    if segments.next().is_some() {
        return None;
    }
    Some((kind, id))
}

impl State {
    fn insert(&mut self, kind: ResourceKind, mut attributes: Map<String, Value>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;

        attributes.remove("password");
        let organization_id = take_organization_id(&mut attributes).flatten();
        if kind == ResourceKind::Users {
            attributes.entry("owner").or_insert(Value::Bool(false));
        }
        if kind != ResourceKind::Accounts {
            attributes.entry("deleted_at").or_insert(Value::Null);
        }
        let timestamp = now();
        attributes
            .entry("created_at")
            .or_insert_with(|| timestamp.clone());
        attributes.entry("updated_at").or_insert(timestamp);

        self.tables.entry(kind).or_default().insert(
            id,
            Row {
                attributes,
                organization_id
            }
        );
        id
    }

    fn list(&self, kind: ResourceKind, query: &[(&'static str, String)]) -> Value {
        let param = |name: &str, default: usize| {
            query
                .iter()
                .find(|(key, _)| *key == name)
                .and_then(|(_, value)| value.parse().ok())
                .unwrap_or(default)
        };
        let skip = param("skip", 0);
        let limit = param("limit", 10);

        let empty = BTreeMap::new();
        let table = self.tables.get(&kind).unwrap_or(&empty);
        let data: Vec<Value> = table
            .iter()
            .skip(skip)
            .take(limit)
            .map(|(id, row)| resource(kind, *id, row))
            .collect();

        json!({
            "data": data,
            "meta": { "total": table.len() },
            "links": {
                "self": format!("/{}?skip={}&limit={}", kind, skip, limit),
                "first": format!("/{}?skip=0&limit={}", kind, limit)
            }
        })
    }

    fn get(&self, kind: ResourceKind, id: u64) -> Result<Value, ApiError> {
        let row = self
            .tables
            .get(&kind)
            .and_then(|table| table.get(&id))
            .ok_or_else(not_found)?;
        Ok(json!({
            "data": resource(kind, id, row),
            "links": { "self": format!("/{}/{}", kind, id) }
        }))
    }

    fn update(
        &mut self,
        kind: ResourceKind,
        id: u64,
        mut attributes: Map<String, Value>
    ) -> Result<Value, ApiError> {
        let row = self
            .tables
            .get_mut(&kind)
            .and_then(|table| table.get_mut(&id))
            .ok_or_else(not_found)?;

        attributes.remove("password");
        if let Some(organization_id) = take_organization_id(&mut attributes) {
            row.organization_id = organization_id;
        }
        row.attributes.extend(attributes);
        row.attributes.insert("updated_at".to_string(), now());
        self.get(kind, id)
    }

    fn remove(&mut self, kind: ResourceKind, id: u64) -> Result<Value, ApiError> {
        let deleted = self.get(kind, id)?;
        if let Some(table) = self.tables.get_mut(&kind) {
            table.remove(&id);
        }
        Ok(deleted)
    }
}

/// `Some(None)` if the id was explicitly cleared.
fn take_organization_id(attributes: &mut Map<String, Value>) -> Option<Option<String>> {
    attributes.remove("organization_id").map(|value| match value {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None
    })
}

fn resource(kind: ResourceKind, id: u64, row: &Row) -> Value {
    let mut resource = json!({
        "id": id.to_string(),
        "type": kind.as_str(),
        "attributes": row.attributes
    });
    if let Some(organization_id) = &row.organization_id {
        resource["relationships"] = json!({
            "organization": {
                "data": { "type": "organizations", "id": organization_id }
            }
        });
    }
    resource
}

impl<TNext: Exchange> ExchangeFactory<TNext> for MockServer {
    type Output = MockServer;

    fn build(self, _next: TNext) -> MockServer {
        self
    }
}

#[async_trait]
impl Exchange for MockServer {
    async fn run<C: Client>(&self, operation: Operation, _client: C) -> ExchangeResult {
        let latency = {
            let mut state = self.0.lock();
            state.calls.push(Call {
                method: operation.request.method,
                path: operation.request.path.clone(),
                query: operation
                    .request
                    .query
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone()))
                    .collect(),
                body: operation.request.body.clone()
            });
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let data = self.handle(&operation.request)?;
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
