use super::{timestamp, Entity, Resource, ResourceKind};
use crate::{
    validation::{self, Validate, Validator},
    view::{format_date, Tabular},
    FieldErrors
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The account entity type.
pub struct Account;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountAttributes {
    pub name: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>
}

/// Missing fields deserialize as empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAccount {
    pub name: String
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>
}

impl Entity for Account {
    const KIND: ResourceKind = ResourceKind::Accounts;

    type Attributes = AccountAttributes;
    type Create = NewAccount;
    type Patch = AccountPatch;
}

impl Validate for NewAccount {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .field("name", &self.name, &validation::name())
            .finish()
    }
}

impl Validate for AccountPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .optional("name", self.name.as_deref(), &validation::name())
            .finish()
    }
}

impl Tabular for Account {
    const COLUMNS: &'static [&'static str] = &["Name", "Created At"];

    fn row(account: &Resource<AccountAttributes>) -> Vec<String> {
        vec![
            account.attributes.name.clone(),
            format_date(&account.attributes.created_at)
        ]
    }
}
