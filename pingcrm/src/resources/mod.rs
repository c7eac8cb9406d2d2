//! The resource clients, one per entity type, and the wire types they speak.

use crate::{
    client::Client,
    types::{Method, OperationType, Request},
    validation::Validate,
    ApiError, DebugInfo, Document, Exchange, QueryOptions
};
#[cfg(feature = "observable")]
use crate::Observable;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::{fmt, marker::PhantomData, str::FromStr};

mod accounts;
mod contacts;
mod document;
mod organizations;
pub mod tags;
mod users;

pub use accounts::{Account, AccountAttributes, AccountPatch, NewAccount};
pub use contacts::{Contact, ContactAttributes, ContactPatch, NewContact};
pub use document::{
    timestamp, Links, ListDocument, ListMeta, RelationshipLink, Relationships, Resource,
    ResourceIdentifier, SingleDocument
};
pub use organizations::{NewOrganization, Organization, OrganizationAttributes, OrganizationPatch};
pub use users::{NewUser, User, UserAttributes, UserPatch};

/// The entity types the API knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Accounts,
    Users,
    Organizations,
    Contacts
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Accounts,
        ResourceKind::Users,
        ResourceKind::Organizations,
        ResourceKind::Contacts
    ];

    /// The JSON:API type, which doubles as the collection path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "accounts",
            ResourceKind::Users => "users",
            ResourceKind::Organizations => "organizations",
            ResourceKind::Contacts => "contacts"
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "account",
            ResourceKind::Users => "user",
            ResourceKind::Organizations => "organization",
            ResourceKind::Contacts => "contact"
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type {0:?}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s || kind.singular() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// What an operation does. Together with the [`ResourceKind`](enum.ResourceKind.html) this is
/// what the request fingerprint is computed from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Action {
    List { limit: u32, skip: u32 },
    Get { id: String },
    Create,
    Update { id: String },
    Remove { id: String }
}

impl Action {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Action::List { .. } | Action::Get { .. } => OperationType::Query,
            _ => OperationType::Mutation
        }
    }

    /// The entity id this action targets, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Action::Get { id } | Action::Update { id } | Action::Remove { id } => Some(id),
            _ => None
        }
    }
}

/// Pagination for list requests. Unset values default to `skip = 0` and the configured page
/// size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub skip: Option<u32>
}

impl ListParams {
    pub fn limit(limit: u32) -> Self {
        ListParams {
            limit: Some(limit),
            skip: None
        }
    }
}

/// Ties an entity type to its wire types.
pub trait Entity: Send + Sync + 'static {
    const KIND: ResourceKind;

    /// The `attributes` object of a fetched entity.
    type Attributes: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static;
    /// The attributes sent when creating an entity.
    type Create: Serialize + Validate + Send + Sync;
    /// A partial update. Fields that are `None` aren't sent.
    type Patch: Serialize + Validate + Send + Sync;
}

/// A decoded result along with how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub debug_info: Option<DebugInfo>
}

pub(crate) fn decode<T: DeserializeOwned>(document: &Document) -> Result<T, ApiError> {
    Ok(T::deserialize(&**document)?)
}

/// Serialize form input into request attributes, trimming every text field except the password.
pub(crate) fn attributes<T: Serialize>(input: &T) -> Result<Value, ApiError> {
    let mut attributes = serde_json::to_value(input)?;
    if let Value::Object(fields) = &mut attributes {
        for (name, value) in fields.iter_mut() {
            if name == "password" {
                continue;
            }
            if let Value::String(text) = value {
                let trimmed = text.trim();
                if trimmed.len() != text.len() {
                    *text = trimmed.to_string();
                }
            }
        }
    }
    Ok(attributes)
}

/// Issues the HTTP requests for one entity type. Reads go through the cache, writes
/// invalidate whatever they affect.
pub struct ResourceClient<E: Entity, M: Exchange> {
    client: Client<M>,
    entity: PhantomData<E>
}

impl<E: Entity, M: Exchange> Clone for ResourceClient<E, M> {
    fn clone(&self) -> Self {
        ResourceClient {
            client: self.client.clone(),
            entity: PhantomData
        }
    }
}

pub type Accounts<M> = ResourceClient<Account, M>;
pub type Users<M> = ResourceClient<User, M>;
pub type Organizations<M> = ResourceClient<Organization, M>;
pub type Contacts<M> = ResourceClient<Contact, M>;

impl<E: Entity, M: Exchange> ResourceClient<E, M> {
    pub(crate) fn new(client: Client<M>) -> Self {
        ResourceClient {
            client,
            entity: PhantomData
        }
    }

    pub fn kind(&self) -> ResourceKind {
        E::KIND
    }

    fn collection_path() -> String {
        format!("/{}", E::KIND.as_str())
    }

    fn item_path(id: &str) -> String {
        format!("/{}/{}", E::KIND.as_str(), id)
    }

    fn list_request(&self, params: ListParams) -> (Action, Request) {
        let limit = params
            .limit
            .unwrap_or_else(|| self.client.0.config.default_page_size);
        let skip = params.skip.unwrap_or(0);
        let request = Request {
            method: Method::Get,
            path: Self::collection_path(),
            query: vec![("skip", skip.to_string()), ("limit", limit.to_string())],
            body: None
        };
        (Action::List { limit, skip }, request)
    }

    fn get_request(id: &str) -> (Action, Request) {
        let request = Request {
            method: Method::Get,
            path: Self::item_path(id),
            query: Vec::new(),
            body: None
        };
        (Action::Get { id: id.to_string() }, request)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        action: Action,
        request: Request,
        options: QueryOptions
    ) -> Result<Fetched<T>, ApiError> {
        let operation = self
            .client
            .0
            .create_request_operation(E::KIND, action, request, options);
        let response = self.client.0.execute_request_operation(operation).await?;
        Ok(Fetched {
            data: decode(&response.data)?,
            debug_info: response.debug_info
        })
    }

    async fn mutate(&self, action: Action, request: Request) -> Result<Document, ApiError> {
        let operation = self.client.0.create_request_operation(
            E::KIND,
            action,
            request,
            QueryOptions::default()
        );
        let response = self.client.0.execute_request_operation(operation).await?;
        Ok(response.data)
    }

    /// Fetch one page of entities.
    pub async fn list(&self, params: ListParams) -> Result<ListDocument<E::Attributes>, ApiError> {
        self.list_with_options(params, QueryOptions::default())
            .await
            .map(|fetched| fetched.data)
    }

    pub async fn list_with_options(
        &self,
        params: ListParams,
        options: QueryOptions
    ) -> Result<Fetched<ListDocument<E::Attributes>>, ApiError> {
        let (action, request) = self.list_request(params);
        self.query(action, request, options).await
    }

    /// Fetch a single entity. Fails with `ApiError::NotFound` if it doesn't exist.
    pub async fn get(&self, id: &str) -> Result<SingleDocument<E::Attributes>, ApiError> {
        self.get_with_options(id, QueryOptions::default())
            .await
            .map(|fetched| fetched.data)
    }

    pub async fn get_with_options(
        &self,
        id: &str,
        options: QueryOptions
    ) -> Result<Fetched<SingleDocument<E::Attributes>>, ApiError> {
        let (action, request) = Self::get_request(id);
        self.query(action, request, options).await
    }

    /// Create an entity and return it as stored by the server.
    pub async fn create(&self, input: &E::Create) -> Result<Resource<E::Attributes>, ApiError> {
        let body = json!({
            "data": {
                "type": E::KIND.as_str(),
                "attributes": attributes(input)?
            }
        });
        let request = Request {
            method: Method::Post,
            path: Self::collection_path(),
            query: Vec::new(),
            body: Some(body)
        };
        let document = self.mutate(Action::Create, request).await?;
        Ok(decode::<SingleDocument<E::Attributes>>(&document)?.data)
    }

    /// Update the supplied fields of an entity and return the result.
    pub async fn update(
        &self,
        id: &str,
        patch: &E::Patch
    ) -> Result<Resource<E::Attributes>, ApiError> {
        let body = json!({
            "data": {
                "type": E::KIND.as_str(),
                "id": id,
                "attributes": attributes(patch)?
            }
        });
        let request = Request {
            method: Method::Patch,
            path: Self::item_path(id),
            query: Vec::new(),
            body: Some(body)
        };
        let document = self
            .mutate(Action::Update { id: id.to_string() }, request)
            .await?;
        Ok(decode::<SingleDocument<E::Attributes>>(&document)?.data)
    }

    /// Delete an entity. Returns the server's confirmation, which is `null` for empty bodies.
    pub async fn remove(&self, id: &str) -> Result<Value, ApiError> {
        let request = Request {
            method: Method::Delete,
            path: Self::item_path(id),
            query: Vec::new(),
            body: None
        };
        let document = self
            .mutate(Action::Remove { id: id.to_string() }, request)
            .await?;
        Ok((*document).clone())
    }

    /// Subscribe to a page of entities. The stream yields the current result right away and a
    /// new one every time a mutation invalidates the page.
    #[cfg(feature = "observable")]
    pub async fn watch_list(
        &self,
        params: ListParams
    ) -> Observable<ListDocument<E::Attributes>, M> {
        let (action, request) = self.list_request(params);
        let operation = self.client.0.create_request_operation(
            E::KIND,
            action,
            request,
            QueryOptions::default()
        );
        self.client.0.subscribe(operation).await
    }

    /// Subscribe to a single entity.
    #[cfg(feature = "observable")]
    pub async fn watch(&self, id: &str) -> Observable<SingleDocument<E::Attributes>, M> {
        let (action, request) = Self::get_request(id);
        let operation = self.client.0.create_request_operation(
            E::KIND,
            action,
            request,
            QueryOptions::default()
        );
        self.client.0.subscribe(operation).await
    }
}
