use super::{timestamp, Entity, Resource, ResourceKind};
use crate::{
    validation::{self, Validate, Validator},
    view::{format_date, Tabular},
    FieldErrors
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The organization entity type.
pub struct Organization;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationAttributes {
    pub name: String,
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

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewOrganization {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
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
    pub postal_code: Option<String>
}

impl Entity for Organization {
    const KIND: ResourceKind = ResourceKind::Organizations;

    type Attributes = OrganizationAttributes;
    type Create = NewOrganization;
    type Patch = OrganizationPatch;
}

impl Validate for NewOrganization {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .field("name", &self.name, &validation::name())
            .field("email", &self.email, &validation::organization_email())
            .field("phone", &self.phone, &validation::phone())
            .field("address", &self.address, &validation::address())
            .field("city", &self.city, &validation::city())
            .field("region", &self.region, &validation::region())
            .field("country", &self.country, &validation::country())
            .field("postal_code", &self.postal_code, &validation::postal_code())
            .finish()
    }
}

impl Validate for OrganizationPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .optional("name", self.name.as_deref(), &validation::name())
            .optional(
                "email",
                self.email.as_deref(),
                &validation::organization_email()
            )
            .optional("phone", self.phone.as_deref(), &validation::phone())
            .optional("address", self.address.as_deref(), &validation::address())
            .optional("city", self.city.as_deref(), &validation::city())
            .optional("region", self.region.as_deref(), &validation::region())
            .optional("country", self.country.as_deref(), &validation::country())
            .optional(
                "postal_code",
                self.postal_code.as_deref(),
                &validation::postal_code()
            )
            .finish()
    }
}

impl Tabular for Organization {
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "Phone", "City", "Created At"];

    fn row(organization: &Resource<OrganizationAttributes>) -> Vec<String> {
        let attributes = &organization.attributes;
        vec![
            attributes.name.clone(),
            attributes.email.clone(),
            attributes.phone.clone(),
            attributes.city.clone(),
            format_date(&attributes.created_at)
        ]
    }
}
