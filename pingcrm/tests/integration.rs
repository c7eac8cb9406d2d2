use futures::StreamExt;
use lazy_static::lazy_static;
use pingcrm::{
    client::CacheStore,
    config::ClientConfig,
    exchange::Method,
    resources::{AccountPatch, ContactPatch, ListParams, NewAccount, ResourceKind},
    ApiError, QueryOptions, RequestPolicy, ResultSource
};
use pingcrm_test::{client, client_with_store, fixtures, MockServer};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;

lazy_static! {
    static ref FIRST_PAGE: ListParams = ListParams::limit(10);
}

#[tokio::test]
async fn update_then_get_reflects_merged_attributes() {
    let server = MockServer::new();
    let organization_id = fixtures::seed_organization(&server);
    let id = fixtures::seed_contact(&server, Some(&organization_id));
    let contacts = client(&server).contacts();

    let before = contacts.get(&id).await.unwrap().data;
    assert_eq!(before.attributes.city, "London");

    let patch = ContactPatch {
        city: Some("Cambridge".to_string()),
        ..ContactPatch::default()
    };
    let updated = contacts.update(&id, &patch).await.unwrap();
    assert_eq!(updated.attributes.city, "Cambridge");

    let after = contacts.get(&id).await.unwrap().data;
    assert_eq!(after.attributes.city, "Cambridge");
    assert_eq!(after.attributes.first_name, before.attributes.first_name);
    assert_eq!(after.attributes.postal_code, before.attributes.postal_code);
    assert_eq!(after.organization_id(), Some(organization_id.as_str()));
}

#[tokio::test]
async fn create_then_list_includes_the_new_entity() {
    let server = MockServer::new();
    fixtures::seed_acme(&server);
    let accounts = client(&server).accounts();

    let before = accounts.list(*FIRST_PAGE).await.unwrap();
    assert_eq!(before.meta.total, 1);

    let created = accounts
        .create(&NewAccount {
            name: "Initech".to_string()
        })
        .await
        .unwrap();
    assert_eq!(created.attributes.name, "Initech");

    let after = accounts.list(*FIRST_PAGE).await.unwrap();
    assert_eq!(after.meta.total, 2);
    assert!(after.data.iter().any(|account| account.id == created.id));
    assert_eq!(server.call_count(Method::Get, "/accounts"), 2);
}

#[tokio::test]
async fn remove_then_get_is_not_found() {
    let server = MockServer::new();
    let id = fixtures::seed_user(&server);
    let users = client(&server).users();

    users.get(&id).await.unwrap();
    let confirmation = users.remove(&id).await.unwrap();
    assert_eq!(confirmation["data"]["id"], json!(id));

    let err = users.get(&id).await.unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[tokio::test]
async fn concurrent_gets_share_one_request() {
    let server = MockServer::new().with_latency(Duration::from_millis(20));
    let id = fixtures::seed_acme(&server);
    let accounts = client(&server).accounts();

    let (first, second, third) = futures::join!(
        accounts.get_with_options(&id, QueryOptions::default()),
        accounts.get_with_options(&id, QueryOptions::default()),
        accounts.get_with_options(&id, QueryOptions::default())
    );
    let results = vec![first.unwrap(), second.unwrap(), third.unwrap()];

    assert_eq!(server.call_count(Method::Get, &format!("/accounts/{}", id)), 1);
    assert!(results.iter().all(|result| result.data == results[0].data));
    let deduped = results
        .iter()
        .filter(|result| result.debug_info.map_or(false, |info| info.did_dedup))
        .count();
    assert_eq!(deduped, 2);
}

#[tokio::test]
async fn removing_the_only_account_empties_the_list() {
    let server = MockServer::new();
    let id = fixtures::seed_acme(&server);
    assert_eq!(id, "1");
    let accounts = client(&server).accounts();

    let page = accounts.list(*FIRST_PAGE).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].attributes.name, "Acme");

    accounts.remove("1").await.unwrap();

    let page = accounts.list(*FIRST_PAGE).await.unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.meta.total, 0);
}

#[tokio::test]
async fn rejected_create_surfaces_field_errors_and_keeps_the_cache() {
    let server = MockServer::new();
    fixtures::seed_acme(&server);
    let accounts = client(&server).accounts();

    accounts.list(*FIRST_PAGE).await.unwrap();
    server.respond_once(
        Method::Post,
        "/accounts",
        422,
        r#"{"errors":{"name":"too short"}}"#
    );

    let err = accounts.create(&fixtures::acme()).await.unwrap_err();
    let field_errors = err.field_errors().expect("Should be a validation error");
    assert_eq!(field_errors["name"], "too short");

    let page = accounts
        .list_with_options(*FIRST_PAGE, QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(page.debug_info.unwrap().source, ResultSource::Cache);
    assert_eq!(page.data.meta.total, 1);
    assert_eq!(server.call_count(Method::Get, "/accounts"), 1);
}

#[tokio::test]
async fn server_errors_are_classified() {
    let server = MockServer::new();
    let accounts = client(&server).accounts();

    server.respond_once(Method::Get, "/accounts", 500, "Internal Server Error");
    let err = accounts.list(*FIRST_PAGE).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Server {
            status: 500,
            body: "Internal Server Error".to_string()
        }
    );

    // Failures aren't cached.
    let page = accounts.list(*FIRST_PAGE).await.unwrap();
    assert_eq!(page.meta.total, 0);
}

#[tokio::test]
async fn sends_nested_envelopes_with_only_supplied_fields() {
    let server = MockServer::new();
    let accounts = client(&server).accounts();

    let created = accounts.create(&fixtures::acme()).await.unwrap();
    accounts
        .update(
            &created.id,
            &AccountPatch {
                name: Some("Acme Corp".to_string())
            }
        )
        .await
        .unwrap();

    let calls = server.calls();
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(
        calls[0].body,
        Some(json!({ "data": { "type": "accounts", "attributes": { "name": "Acme" } } }))
    );
    assert_eq!(calls[1].method, Method::Patch);
    assert_eq!(calls[1].path, format!("/accounts/{}", created.id));
    assert_eq!(
        calls[1].body,
        Some(json!({
            "data": { "type": "accounts", "id": created.id, "attributes": { "name": "Acme Corp" } }
        }))
    );

    let contacts = client(&server).contacts();
    let contact = contacts.create(&fixtures::contact()).await.unwrap();
    contacts
        .update(
            &contact.id,
            &ContactPatch {
                phone: Some("+441234567891".to_string()),
                ..ContactPatch::default()
            }
        )
        .await
        .unwrap();
    assert_eq!(
        server.calls()[3].body,
        Some(json!({
            "data": { "type": "contacts", "id": contact.id, "attributes": { "phone": "+441234567891" } }
        }))
    );
}

#[tokio::test]
async fn pages_through_lists() {
    let server = MockServer::new();
    fixtures::seed_accounts(&server, 15);
    let accounts = client(&server).accounts();

    let first = accounts.list(ListParams::default()).await.unwrap();
    assert_eq!(first.data.len(), 10);
    assert_eq!(first.meta.total, 15);

    let second = accounts
        .list(ListParams {
            limit: None,
            skip: Some(10)
        })
        .await
        .unwrap();
    assert_eq!(second.data.len(), 5);
    assert_eq!(second.data[0].attributes.name, "Account 11");

    let queries: Vec<_> = server.calls().into_iter().map(|call| call.query).collect();
    assert_eq!(
        queries,
        vec![
            vec![
                ("skip".to_string(), "0".to_string()),
                ("limit".to_string(), "10".to_string())
            ],
            vec![
                ("skip".to_string(), "10".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        ]
    );
}

#[tokio::test]
async fn cache_only_reads_never_hit_the_network() {
    let server = MockServer::new();
    let id = fixtures::seed_organization(&server);
    let organizations = client(&server).organizations();
    let cache_only = || QueryOptions::with_request_policy(RequestPolicy::CacheOnly);

    let err = organizations
        .get_with_options(&id, cache_only())
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotCached);
    assert!(server.calls().is_empty());

    organizations.get(&id).await.unwrap();
    let cached = organizations
        .get_with_options(&id, cache_only())
        .await
        .unwrap();
    assert_eq!(cached.data.data.attributes.name, "Globex Corporation");
    assert_eq!(server.calls().len(), 1);
}

#[tokio::test]
async fn clients_sharing_a_store_see_each_others_invalidations() {
    let server = MockServer::new();
    let id = fixtures::seed_acme(&server);
    let store = Arc::new(CacheStore::default());
    let reader = client_with_store(&server, ClientConfig::default(), store.clone()).accounts();
    let writer = client_with_store(&server, ClientConfig::default(), store).accounts();

    reader.get(&id).await.unwrap();
    writer
        .update(
            &id,
            &AccountPatch {
                name: Some("Acme Corp".to_string())
            }
        )
        .await
        .unwrap();

    let account = reader.get(&id).await.unwrap();
    assert_eq!(account.data.attributes.name, "Acme Corp");
    assert_eq!(server.call_count(Method::Get, &format!("/accounts/{}", id)), 2);
}

#[tokio::test]
async fn watchers_see_mutations_made_through_another_client() {
    let server = MockServer::new();
    let id = fixtures::seed_acme(&server);
    let store = Arc::new(CacheStore::default());
    let reader = client_with_store(&server, ClientConfig::default(), store.clone()).accounts();
    let writer = client_with_store(&server, ClientConfig::default(), store).accounts();

    let mut watched = reader.watch_list(*FIRST_PAGE).await;
    let first = watched.next().await.unwrap().unwrap();
    assert_eq!(first.data[0].attributes.name, "Acme");

    writer
        .update(
            &id,
            &AccountPatch {
                name: Some("Acme Corp".to_string())
            }
        )
        .await
        .unwrap();

    let second = timeout(Duration::from_secs(1), watched.next())
        .await
        .expect("Watcher should have been notified")
        .unwrap()
        .unwrap();
    assert_eq!(second.data[0].attributes.name, "Acme Corp");
}

#[tokio::test]
async fn watchers_recover_after_a_failed_refetch() {
    let server = MockServer::new();
    let id = fixtures::seed_acme(&server);
    let accounts = client(&server).accounts();
    let rename = |name: &str| AccountPatch {
        name: Some(name.to_string())
    };

    let mut watched = accounts.watch(&id).await;
    watched.next().await.unwrap().unwrap();

    server.respond_once(Method::Get, &format!("/accounts/{}", id), 500, "boom");
    accounts.update(&id, &rename("One")).await.unwrap();
    let failed = timeout(Duration::from_secs(1), watched.next())
        .await
        .expect("Watcher should have been notified")
        .unwrap();
    assert!(failed.is_err());

    accounts.update(&id, &rename("Two")).await.unwrap();
    let recovered = timeout(Duration::from_secs(1), watched.next())
        .await
        .expect("Watcher should have been notified again")
        .unwrap()
        .unwrap();
    assert_eq!(recovered.data.attributes.name, "Two");
}

#[tokio::test]
async fn unrelated_mutations_dont_split_concurrent_gets() {
    let slow = MockServer::new().with_latency(Duration::from_millis(50));
    let fast = MockServer::new();
    let id = fixtures::seed_acme(&slow);
    let store = Arc::new(CacheStore::default());
    let accounts = client_with_store(&slow, ClientConfig::default(), store.clone()).accounts();
    let users = client_with_store(&fast, ClientConfig::default(), store).users();

    let (first, second) = futures::join!(accounts.get(&id), async {
        users.create(&fixtures::user()).await.unwrap();
        accounts.get(&id).await
    });

    assert_eq!(first.unwrap().data, second.unwrap().data);
    assert_eq!(slow.call_count(Method::Get, &format!("/accounts/{}", id)), 1);
}

#[tokio::test]
async fn text_input_is_trimmed_before_sending() {
    let server = MockServer::new();
    let accounts = client(&server).accounts();

    let created = accounts
        .create(&NewAccount {
            name: "  Acme  ".to_string()
        })
        .await
        .unwrap();

    assert_eq!(created.attributes.name, "Acme");
    let stored = server
        .attributes(ResourceKind::Accounts, &created.id)
        .expect("Account should exist");
    assert_eq!(stored["name"], json!("Acme"));
}

#[tokio::test]
async fn users_never_echo_passwords() {
    let server = MockServer::new();
    let users = client(&server).users();

    let created = users.create(&fixtures::user()).await.unwrap();
    assert_eq!(created.attributes.full_name(), "Grace Hopper");
    assert!(!created.attributes.owner);
    assert!(created.attributes.deleted_at.is_none());

    let stored = server
        .attributes(ResourceKind::Users, &created.id)
        .expect("User should exist");
    assert!(stored.get("password").is_none());
}

#[tokio::test]
async fn watchers_get_fresh_results_after_mutations() {
    let server = MockServer::new();
    let id = fixtures::seed_acme(&server);
    let client = client(&server);
    let accounts = client.accounts();

    let mut watched = accounts.watch_list(*FIRST_PAGE).await;
    let first = watched.next().await.unwrap().unwrap();
    assert_eq!(first.data[0].attributes.name, "Acme");
    assert_eq!(client.store().subscriber_count(watched.key()), 1);

    accounts
        .update(
            &id,
            &AccountPatch {
                name: Some("Acme Corp".to_string())
            }
        )
        .await
        .unwrap();

    let second = timeout(Duration::from_secs(1), watched.next())
        .await
        .expect("Watcher should have been notified")
        .unwrap()
        .unwrap();
    assert_eq!(second.data[0].attributes.name, "Acme Corp");
}

#[tokio::test]
async fn dropping_a_watcher_unsubscribes() {
    let server = MockServer::new();
    let id = fixtures::seed_acme(&server);
    let client = client(&server);
    let accounts = client.accounts();

    let first = accounts.watch(&id).await;
    let second = accounts.watch(&id).await;
    let key = first.key();
    assert_eq!(key, second.key());
    assert_eq!(client.store().subscriber_count(key), 2);

    drop(first);
    assert_eq!(client.store().subscriber_count(key), 1);
    drop(second);
    assert_eq!(client.store().subscriber_count(key), 0);

    // Nobody is watching anymore, so the invalidated entry is simply dropped.
    accounts.remove(&id).await.unwrap();
    assert!(!client.store().contains(key));
}
