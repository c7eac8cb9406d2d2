use crate::resources::{Action, ResourceKind};
use serde::Serialize;
use std::num::Wrapping;

/// When we have separate values it's useful to run a progressive
/// version of djb2 where we pretend that we're still looping over
/// the same value
pub fn progressive_hash<V: Serialize>(h: u64, x: &V) -> u64 {
    let x = bincode::serialize(x).expect("Failed to convert value to Vec<u8> for hashing");

    let mut h = Wrapping(h);

    for byte in x {
        h = (h << 5) + h + Wrapping(byte as u64)
    }

    h.0
}

/// The djb2 hash of a string, used as the seed for [`progressive_hash`](fn.progressive_hash.html).
pub fn hash_str(s: &str) -> u64 {
    let mut h = Wrapping(5381u64);
    for byte in s.bytes() {
        h = (h << 5) + h + Wrapping(byte as u64)
    }
    h.0
}

/// The request fingerprint of an action on an entity type. Stable for the lifetime of the
/// process and different for different kinds, actions or parameters.
pub fn fingerprint(kind: ResourceKind, action: &Action) -> u64 {
    progressive_hash(hash_str(kind.as_str()), action)
}

#[cfg(test)]
mod test {
    use super::fingerprint;
    use crate::resources::{Action, ResourceKind};

    #[test]
    fn fingerprints_are_stable() {
        let action = Action::Get { id: "1".to_string() };
        assert_eq!(
            fingerprint(ResourceKind::Accounts, &action),
            fingerprint(ResourceKind::Accounts, &action.clone())
        );
    }

    #[test]
    fn fingerprints_differ_by_kind_and_params() {
        let get_1 = Action::Get { id: "1".to_string() };
        let get_2 = Action::Get { id: "2".to_string() };
        let page_1 = Action::List { limit: 10, skip: 0 };
        let page_2 = Action::List { limit: 10, skip: 10 };

        let keys = vec![
            fingerprint(ResourceKind::Accounts, &get_1),
            fingerprint(ResourceKind::Contacts, &get_1),
            fingerprint(ResourceKind::Accounts, &get_2),
            fingerprint(ResourceKind::Accounts, &page_1),
            fingerprint(ResourceKind::Accounts, &page_2),
            fingerprint(ResourceKind::Users, &page_1)
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
