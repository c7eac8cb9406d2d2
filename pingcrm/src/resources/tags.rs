//! Which cached results a request provides and which ones a mutation invalidates.
//!
//! Both are pure functions of the request and, for reads, the response body, so they can be
//! tested without any HTTP involved.

use super::{Action, ResourceKind};
use pingcrm_normalized_cache::{Tag, TagSet};
use serde_json::Value;

fn entity_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None
    }
}

/// The tags of a query result. A list provides one tag per returned entity plus the list tag
/// (only the list tag if the body has no usable `data` array), a single entity provides its own
/// tag. Mutations provide nothing.
pub fn provided_tags(kind: ResourceKind, action: &Action, result: &Value) -> TagSet {
    let kind_str = kind.as_str();
    let mut tags = TagSet::new();
    match action {
        Action::List { .. } => {
            if let Some(entities) = result.get("data").and_then(Value::as_array) {
                tags.extend(
                    entities
                        .iter()
                        .filter_map(entity_id)
                        .map(|id| Tag::entity(kind_str, id))
                );
            }
            tags.insert(Tag::list(kind_str));
        }
        Action::Get { id } => {
            tags.insert(Tag::entity(kind_str, id.as_str()));
        }
        Action::Create | Action::Update { .. } | Action::Remove { .. } => {}
    }
    tags
}

/// The tags a query's result is known to provide before it's loaded: the entity tag for a
/// single entity, the list tag for a list.
pub fn scope_tags(kind: ResourceKind, action: &Action) -> TagSet {
    let kind_str = kind.as_str();
    let mut tags = TagSet::new();
    match action {
        Action::List { .. } => {
            tags.insert(Tag::list(kind_str));
        }
        Action::Get { id } => {
            tags.insert(Tag::entity(kind_str, id.as_str()));
        }
        Action::Create | Action::Update { .. } | Action::Remove { .. } => {}
    }
    tags
}

/// The tags a successful mutation invalidates. Creating invalidates every list of the type,
/// updating or deleting also invalidates the entity itself.
pub fn invalidated_tags(kind: ResourceKind, action: &Action) -> TagSet {
    let kind_str = kind.as_str();
    let mut tags = TagSet::new();
    match action {
        Action::Create => {
            tags.insert(Tag::list(kind_str));
        }
        Action::Update { id } | Action::Remove { id } => {
            tags.insert(Tag::entity(kind_str, id.as_str()));
            tags.insert(Tag::list(kind_str));
        }
        Action::List { .. } | Action::Get { .. } => {}
    }
    tags
}

#[cfg(test)]
mod test {
    use super::{invalidated_tags, provided_tags, scope_tags};
    use crate::resources::{Action, ResourceKind};
    use pingcrm_normalized_cache::{Tag, TagSet};
    use serde_json::json;

    fn tags(tags: Vec<Tag>) -> TagSet {
        tags.into_iter().collect()
    }

    #[test]
    fn lists_provide_entity_and_list_tags() {
        let body = json!({
            "data": [
                { "id": "1", "type": "contacts" },
                { "id": 2, "type": "contacts" }
            ],
            "meta": { "total": 2 }
        });
        let action = Action::List { limit: 10, skip: 0 };

        assert_eq!(
            provided_tags(ResourceKind::Contacts, &action, &body),
            tags(vec![
                Tag::entity("contacts", "1"),
                Tag::entity("contacts", "2"),
                Tag::list("contacts")
            ])
        );
        assert_eq!(
            provided_tags(ResourceKind::Contacts, &action, &json!(null)),
            tags(vec![Tag::list("contacts")])
        );
    }

    #[test]
    fn single_entities_provide_their_own_tag() {
        let action = Action::Get { id: "7".to_string() };
        assert_eq!(
            provided_tags(ResourceKind::Users, &action, &json!({ "data": {} })),
            tags(vec![Tag::entity("users", "7")])
        );
    }

    #[test]
    fn mutations_invalidate_what_they_touch() {
        assert_eq!(
            invalidated_tags(ResourceKind::Accounts, &Action::Create),
            tags(vec![Tag::list("accounts")])
        );

        let expected = tags(vec![
            Tag::entity("organizations", "3"),
            Tag::list("organizations")
        ]);
        let update = Action::Update { id: "3".to_string() };
        let remove = Action::Remove { id: "3".to_string() };
        assert_eq!(invalidated_tags(ResourceKind::Organizations, &update), expected);
        assert_eq!(invalidated_tags(ResourceKind::Organizations, &remove), expected);
    }

    #[test]
    fn scopes_are_part_of_every_result() {
        let list = Action::List { limit: 10, skip: 0 };
        let body = json!({ "data": [{ "id": "4" }], "meta": { "total": 1 } });
        let scope = scope_tags(ResourceKind::Contacts, &list);
        assert_eq!(scope, tags(vec![Tag::list("contacts")]));
        assert!(provided_tags(ResourceKind::Contacts, &list, &body).intersects(&scope));

        let get = Action::Get { id: "4".to_string() };
        assert_eq!(
            scope_tags(ResourceKind::Contacts, &get),
            provided_tags(ResourceKind::Contacts, &get, &json!({}))
        );
        assert!(scope_tags(ResourceKind::Contacts, &Action::Create).is_empty());
    }

    #[test]
    fn every_affected_query_is_covered() {
        let list = Action::List { limit: 10, skip: 0 };
        let list_body = json!({ "data": [{ "id": "1" }], "meta": { "total": 1 } });
        let get = Action::Get { id: "1".to_string() };

        let list_tags = provided_tags(ResourceKind::Accounts, &list, &list_body);
        let get_tags = provided_tags(ResourceKind::Accounts, &get, &json!({}));

        for action in vec![
            Action::Update { id: "1".to_string() },
            Action::Remove { id: "1".to_string() }
        ] {
            let invalidated = invalidated_tags(ResourceKind::Accounts, &action);
            assert!(invalidated.intersects(&list_tags));
            assert!(invalidated.intersects(&get_tags));
        }
        assert!(invalidated_tags(ResourceKind::Accounts, &Action::Create).intersects(&list_tags));
        assert!(!invalidated_tags(ResourceKind::Users, &Action::Create).intersects(&list_tags));
    }
}
