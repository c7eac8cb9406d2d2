use super::{timestamp, Entity, Resource, ResourceKind};
use crate::{
    validation::{self, Rule, Validate, Validator},
    view::{format_date, Tabular},
    FieldErrors
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user entity type.
pub struct User;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserAttributes {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub owner: bool,
    #[serde(default, with = "timestamp::option")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>
}

impl UserAttributes {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Write-only, never returned by the API.
    pub password: String,
    #[serde(default)]
    pub owner: bool
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<bool>
}

const FIRST_NAME: &[Rule] = &[Rule::Required("First name is required")];
const LAST_NAME: &[Rule] = &[Rule::Required("Last name is required")];
const PASSWORD: &[Rule] = &[Rule::Required("Password is required")];

impl Entity for User {
    const KIND: ResourceKind = ResourceKind::Users;

    type Attributes = UserAttributes;
    type Create = NewUser;
    type Patch = UserPatch;
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .field("first_name", &self.first_name, FIRST_NAME)
            .field("last_name", &self.last_name, LAST_NAME)
            .field("email", &self.email, &validation::email())
            .field("password", &self.password, PASSWORD)
            .finish()
    }
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .optional("first_name", self.first_name.as_deref(), FIRST_NAME)
            .optional("last_name", self.last_name.as_deref(), LAST_NAME)
            .optional("email", self.email.as_deref(), &validation::email())
            .optional("password", self.password.as_deref(), PASSWORD)
            .finish()
    }
}

impl Tabular for User {
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "Role", "Created At"];

    fn row(user: &Resource<UserAttributes>) -> Vec<String> {
        let role = if user.attributes.owner { "Owner" } else { "User" };
        vec![
            user.attributes.full_name(),
            user.attributes.email.clone(),
            role.to_string(),
            format_date(&user.attributes.created_at)
        ]
    }
}
