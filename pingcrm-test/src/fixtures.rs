//! Ready-made inputs and seed data.

use crate::MockServer;
use pingcrm::resources::{NewAccount, NewContact, NewOrganization, NewUser, ResourceKind};
use serde_json::{json, Value};

pub fn acme() -> NewAccount {
    NewAccount {
        name: "Acme".to_string()
    }
}

pub fn organization() -> NewOrganization {
    NewOrganization {
        name: "Globex Corporation".to_string(),
        email: "info@globex.com".to_string(),
        phone: "+15555550123".to_string(),
        address: "1 Cypress Creek Rd".to_string(),
        city: "Cypress Creek".to_string(),
        region: "Oregon".to_string(),
        country: "United States".to_string(),
        postal_code: "97403".to_string()
    }
}

pub fn contact() -> NewContact {
    NewContact {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+441234567890".to_string(),
        address: "12 Analytical St".to_string(),
        city: "London".to_string(),
        region: "Greater London".to_string(),
        country: "UK".to_string(),
        postal_code: "N1 9GU".to_string(),
        organization_id: None
    }
}

pub fn user() -> NewUser {
    NewUser {
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@navy.mil".to_string(),
        password: "cobol-rules".to_string(),
        owner: false
    }
}

fn attributes<T: serde::Serialize>(input: &T) -> Value {
    serde_json::to_value(input).unwrap_or(Value::Null)
}

/// Seed the single "Acme" account. Returns its id.
pub fn seed_acme(server: &MockServer) -> String {
    server.insert(ResourceKind::Accounts, attributes(&acme()))
}

/// Seed `n` accounts named "Account 1" to "Account n". Returns their ids in order.
pub fn seed_accounts(server: &MockServer, n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| server.insert(ResourceKind::Accounts, json!({ "name": format!("Account {}", i) })))
        .collect()
}

pub fn seed_organization(server: &MockServer) -> String {
    server.insert(ResourceKind::Organizations, attributes(&organization()))
}

/// Seed a contact belonging to `organization_id`.
pub fn seed_contact(server: &MockServer, organization_id: Option<&str>) -> String {
    let contact = NewContact {
        organization_id: organization_id.map(String::from),
        ..contact()
    };
    server.insert(ResourceKind::Contacts, attributes(&contact))
}

pub fn seed_user(server: &MockServer) -> String {
    server.insert(ResourceKind::Users, attributes(&user()))
}
