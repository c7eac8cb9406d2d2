use super::{timestamp, Entity, Resource, ResourceKind};
use crate::{
    validation::{self, Rule, Validate, Validator},
    view::{format_date, Tabular},
    FieldErrors
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The contact entity type.
pub struct Contact;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactAttributes {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    #[serde(default, with = "timestamp::option")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>
}

impl ContactAttributes {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>
}

const FIRST_NAME: &[Rule] = &[Rule::Required("First name is required")];
const LAST_NAME: &[Rule] = &[Rule::Required("Last name is required")];
const PHONE: &[Rule] = &[Rule::Required("Phone number is required")];
const ADDRESS: &[Rule] = &[Rule::Required("Address is required")];
const CITY: &[Rule] = &[Rule::Required("City is required")];
const REGION: &[Rule] = &[Rule::Required("Region is required")];
const COUNTRY: &[Rule] = &[Rule::Required("Country is required")];
const POSTAL_CODE: &[Rule] = &[Rule::Required("Postal code is required")];

impl Entity for Contact {
    const KIND: ResourceKind = ResourceKind::Contacts;

    type Attributes = ContactAttributes;
    type Create = NewContact;
    type Patch = ContactPatch;
}

impl Validate for NewContact {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .field("first_name", &self.first_name, FIRST_NAME)
            .field("last_name", &self.last_name, LAST_NAME)
            .field("email", &self.email, &validation::email())
            .field("phone", &self.phone, PHONE)
            .field("address", &self.address, ADDRESS)
            .field("city", &self.city, CITY)
            .field("region", &self.region, REGION)
            .field("country", &self.country, COUNTRY)
            .field("postal_code", &self.postal_code, POSTAL_CODE)
            .finish()
    }
}

impl Validate for ContactPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .optional("first_name", self.first_name.as_deref(), FIRST_NAME)
            .optional("last_name", self.last_name.as_deref(), LAST_NAME)
            .optional("email", self.email.as_deref(), &validation::email())
            .optional("phone", self.phone.as_deref(), PHONE)
            .optional("address", self.address.as_deref(), ADDRESS)
            .optional("city", self.city.as_deref(), CITY)
            .optional("region", self.region.as_deref(), REGION)
            .optional("country", self.country.as_deref(), COUNTRY)
            .optional("postal_code", self.postal_code.as_deref(), POSTAL_CODE)
            .finish()
    }
}

impl Tabular for Contact {
    const COLUMNS: &'static [&'static str] =
        &["Name", "Organization", "Email", "Phone", "City", "Created At"];

    fn row(contact: &Resource<ContactAttributes>) -> Vec<String> {
        let attributes = &contact.attributes;
        vec![
            attributes.full_name(),
            contact.organization_id().unwrap_or_default().to_string(),
            attributes.email.clone(),
            attributes.phone.clone(),
            attributes.city.clone(),
            format_date(&attributes.created_at)
        ]
    }
}
