use crate::{ResultSource, Store, StoreOptions, Tag, TagSet};
use futures::{channel::oneshot, future, poll};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc
    },
    time::Duration
};

type TestStore = Store<&'static str, String>;

lazy_static! {
    static ref ACCOUNT_1: TagSet = vec![Tag::entity("accounts", "1")].into_iter().collect();
    static ref ACCOUNT_LIST: TagSet = vec![Tag::entity("accounts", "1"), Tag::list("accounts")]
        .into_iter()
        .collect();
    static ref LIST_ONLY: TagSet = vec![Tag::list("accounts")].into_iter().collect();
}

fn detail_tags(_: &&'static str) -> TagSet {
    ACCOUNT_1.clone()
}

fn list_tags(_: &&'static str) -> TagSet {
    ACCOUNT_LIST.clone()
}

/// Records every key the store asks to refetch.
fn listen(store: &TestStore) -> Arc<Mutex<Vec<u64>>> {
    let requested = Arc::new(Mutex::new(Vec::new()));
    let sink = requested.clone();
    store.add_refetch_listener(move |key| sink.lock().push(key));
    requested
}

fn counting_loader(
    counter: &Arc<AtomicUsize>,
    value: &'static str
) -> impl FnOnce() -> future::Ready<Result<&'static str, String>> {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(value))
    }
}

#[tokio::test]
async fn serves_fresh_entries_without_loading() {
    let store = TestStore::default();
    let loads = Arc::new(AtomicUsize::new(0));

    let first = store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, counting_loader(&loads, "Acme"))
        .await
        .unwrap();
    let second = store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, counting_loader(&loads, "Other"))
        .await
        .unwrap();

    assert_eq!(first.debug_info.source, ResultSource::Network);
    assert_eq!(second.debug_info.source, ResultSource::Cache);
    assert_eq!(second.data, "Acme");
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(store.tags_of(1), Some(ACCOUNT_1.clone()));
}

#[tokio::test]
async fn concurrent_loads_are_shared() {
    let store = TestStore::default();
    let loads = Arc::new(AtomicUsize::new(0));

    let loader = |loads: Arc<AtomicUsize>| {
        move || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, String>("Acme")
        }
    };

    let (res1, res2) = futures::join!(
        store.fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, loader(loads.clone())),
        store.fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, loader(loads.clone()))
    );
    let res1 = res1.unwrap();
    let res2 = res2.unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1, "Load ran more than once");
    assert_eq!(res1.data, res2.data);
    // Exactly one of them piggybacked on the other
    assert!(res1.debug_info.did_dedup ^ res2.debug_info.did_dedup);
}

#[tokio::test]
async fn errors_are_shared_with_joined_callers() {
    let store = TestStore::default();

    let (res1, res2) = futures::join!(
        store.fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<&'static str, _>("boom".to_string())
        }),
        store.fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("never runs") })
    );

    assert_eq!(res1.unwrap_err(), "boom");
    assert_eq!(res2.unwrap_err(), "boom");
    assert!(!store.contains(1));
}

#[tokio::test]
async fn invalidation_drops_unsubscribed_and_reports_subscribed_entries() {
    let store = TestStore::default();
    let loads = Arc::new(AtomicUsize::new(0));

    store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, counting_loader(&loads, "Acme"))
        .await
        .unwrap();
    store
        .fetch_or_serve(2, LIST_ONLY.clone(), list_tags, counting_loader(&loads, "[Acme]"))
        .await
        .unwrap();
    store.subscribe(2);

    let to_refetch = store.invalidate(&LIST_ONLY);
    assert_eq!(to_refetch, vec![2]);
    assert_eq!(store.is_stale(2), Some(true));
    assert_eq!(store.is_stale(1), Some(false), "Detail entry isn't tagged LIST");
    assert_eq!(store.get(2), None, "Stale entries must not be served");

    let to_refetch = store.invalidate(&ACCOUNT_1);
    assert!(to_refetch.is_empty(), "Already stale entries are reported again");
    assert!(!store.contains(1), "Unsubscribed entry wasn't dropped");

    let refetched = store
        .fetch_or_serve(2, LIST_ONLY.clone(), list_tags, counting_loader(&loads, "[]"))
        .await
        .unwrap();
    assert_eq!(refetched.debug_info.source, ResultSource::Network);
    assert_eq!(refetched.data, "[]");
    assert_eq!(store.is_stale(2), Some(false));
}

#[tokio::test]
async fn invalidating_twice_is_the_same_as_once() {
    let store = TestStore::default();
    let loads = Arc::new(AtomicUsize::new(0));

    for key in 1..=3 {
        store
            .fetch_or_serve(key, LIST_ONLY.clone(), list_tags, counting_loader(&loads, "[Acme]"))
            .await
            .unwrap();
    }
    store.subscribe(1);
    store.subscribe(2);

    let first = store.invalidate(&ACCOUNT_LIST);
    let snapshot: Vec<_> = (1..=3).map(|key| store.is_stale(key)).collect();
    let second = store.invalidate(&ACCOUNT_LIST);

    assert_eq!(first, vec![1, 2]);
    assert!(second.is_empty());
    assert_eq!(
        snapshot,
        (1..=3).map(|key| store.is_stale(key)).collect::<Vec<_>>()
    );
    assert_eq!(snapshot, vec![Some(true), Some(true), None]);
}

#[tokio::test]
async fn failed_refetch_keeps_previous_entry_as_stale() {
    let store = TestStore::default();
    store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("Acme") })
        .await
        .unwrap();

    let res = store
        .refetch(1, ACCOUNT_1.clone(), detail_tags, || async {
            Err::<&'static str, _>("server error".to_string())
        })
        .await;

    assert_eq!(res.unwrap_err(), "server error");
    assert!(store.contains(1), "Previous entry was dropped");
    assert_eq!(store.is_stale(1), Some(true));

    let res = store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("Acme Inc") })
        .await
        .unwrap();
    assert_eq!(res.debug_info.source, ResultSource::Network);
    assert_eq!(res.data, "Acme Inc");
}

#[tokio::test]
async fn superseded_load_does_not_overwrite_newer_result() {
    let store = TestStore::default();
    let (release_slow, slow_gate) = oneshot::channel::<()>();

    let slow = store.refetch(1, ACCOUNT_1.clone(), detail_tags, || async move {
        let _ = slow_gate.await;
        Ok("old")
    });
    let fast = async {
        let res = store.refetch(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("new") }).await;
        release_slow.send(()).unwrap();
        res
    };

    let (slow, fast) = futures::join!(slow, fast);

    // Both callers get the answer to their own request
    assert_eq!(slow.unwrap().data, "old");
    assert_eq!(fast.unwrap().data, "new");
    // But only the last one started is kept
    assert_eq!(store.get(1), Some("new"));
}

#[tokio::test]
async fn invalidation_during_load_writes_stale_entry() {
    let store = TestStore::default();
    let (release, gate) = oneshot::channel::<()>();

    let load = store.fetch_or_serve(1, LIST_ONLY.clone(), list_tags, || async move {
        let _ = gate.await;
        Ok("[Acme]")
    });
    let mutate = async {
        store.invalidate(&LIST_ONLY);
        release.send(()).unwrap();
    };

    let (served, _) = futures::join!(load, mutate);
    let served = served.unwrap();

    assert!(served.invalidated_in_flight);
    assert_eq!(store.is_stale(1), Some(true));
    assert_eq!(store.get(1), None);
}

#[tokio::test]
async fn invalidated_in_flight_load_is_not_joined() {
    let store = TestStore::default();
    let loads = Arc::new(AtomicUsize::new(0));
    let (release, gate) = oneshot::channel::<()>();

    let mut first = Box::pin(store.fetch_or_serve(
        1,
        LIST_ONLY.clone(),
        list_tags,
        || async move {
            let _ = gate.await;
            Ok("[Acme]")
        }
    ));
    assert!(poll!(first.as_mut()).is_pending());

    store.invalidate(&LIST_ONLY);

    let second = store
        .fetch_or_serve(1, LIST_ONLY.clone(), list_tags, counting_loader(&loads, "[]"))
        .await
        .unwrap();
    assert!(!second.debug_info.did_dedup);
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    release.send(()).unwrap();
    let first = first.await.unwrap();
    assert_eq!(first.data, "[Acme]");
    // The newer load wins
    assert_eq!(store.get(1), Some("[]"));
}

#[tokio::test]
async fn abandoned_load_lets_joined_callers_retry() {
    let store = TestStore::default();

    let mut leader = Box::pin(store.fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || {
        future::pending::<Result<&'static str, String>>()
    }));
    assert!(poll!(leader.as_mut()).is_pending());

    let mut follower = Box::pin(store.fetch_or_serve(
        1,
        ACCOUNT_1.clone(),
        detail_tags,
        || async { Ok("Acme") }
    ));
    assert!(poll!(follower.as_mut()).is_pending(), "Follower didn't join");

    drop(leader);

    let served = follower.await.unwrap();
    assert_eq!(served.data, "Acme");
    assert!(!served.debug_info.did_dedup);
}

#[tokio::test]
async fn idle_entries_are_evicted_after_grace_period() {
    let store = TestStore::new(StoreOptions {
        gc_grace: Duration::from_millis(0)
    });
    store
        .fetch_or_serve(2, LIST_ONLY.clone(), list_tags, || async { Ok("[Acme]") })
        .await
        .unwrap();
    store.subscribe(2);
    store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("Acme") })
        .await
        .unwrap();

    assert_eq!(store.collect_garbage(), 1);
    assert!(!store.contains(1));
    assert!(store.contains(2), "Subscribed entry was evicted");

    assert_eq!(store.unsubscribe(2), 0);
    assert_eq!(store.collect_garbage(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn entries_survive_within_grace_period() {
    let store = TestStore::new(StoreOptions {
        gc_grace: Duration::from_secs(3600)
    });
    store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("Acme") })
        .await
        .unwrap();
    store.subscribe(1);
    store.subscribe(1);
    assert_eq!(store.subscriber_count(1), 2);
    assert_eq!(store.unsubscribe(1), 1);
    assert_eq!(store.unsubscribe(1), 0);

    assert_eq!(store.collect_garbage(), 0);
    assert_eq!(store.get(1), Some("Acme"));
}

#[tokio::test]
async fn every_listener_hears_about_stale_subscribed_entries() {
    let store = TestStore::default();
    let first = listen(&store);
    let second = listen(&store);

    store
        .fetch_or_serve(2, LIST_ONLY.clone(), list_tags, || async { Ok("[Acme]") })
        .await
        .unwrap();
    store.subscribe(2);
    store.invalidate(&LIST_ONLY);

    assert_eq!(*first.lock(), vec![2]);
    assert_eq!(*second.lock(), vec![2]);
}

#[tokio::test]
async fn removed_listeners_are_not_called() {
    let store = TestStore::default();
    let requested = Arc::new(Mutex::new(Vec::new()));
    let sink = requested.clone();
    let id = store.add_refetch_listener(move |key| sink.lock().push(key));
    store.remove_refetch_listener(id);

    store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("Acme") })
        .await
        .unwrap();
    store.subscribe(1);
    assert_eq!(store.invalidate(&ACCOUNT_1), vec![1]);
    assert!(requested.lock().is_empty());
}

#[tokio::test]
async fn failed_refetch_is_requested_again_by_the_next_invalidation() {
    let store = TestStore::default();
    let requested = listen(&store);

    store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async { Ok("Acme") })
        .await
        .unwrap();
    store.subscribe(1);

    assert_eq!(store.invalidate(&ACCOUNT_1), vec![1]);
    let res = store
        .fetch_or_serve(1, ACCOUNT_1.clone(), detail_tags, || async {
            Err::<&'static str, _>("server error".to_string())
        })
        .await;
    assert!(res.is_err());
    assert_eq!(store.is_stale(1), Some(true));

    assert_eq!(store.invalidate(&ACCOUNT_1), vec![1]);
    assert_eq!(*requested.lock(), vec![1, 1]);
}

#[tokio::test]
async fn unrelated_invalidation_still_joins_in_flight_load() {
    let store = TestStore::default();
    let loads = Arc::new(AtomicUsize::new(0));
    let (release, gate) = oneshot::channel::<()>();
    let users: TagSet = vec![Tag::list("users")].into_iter().collect();

    let mut first = Box::pin(store.fetch_or_serve(
        1,
        ACCOUNT_1.clone(),
        detail_tags,
        || async move {
            let _ = gate.await;
            Ok("Acme")
        }
    ));
    assert!(poll!(first.as_mut()).is_pending());

    store.invalidate(&users);

    let mut second = Box::pin(store.fetch_or_serve(
        1,
        ACCOUNT_1.clone(),
        detail_tags,
        counting_loader(&loads, "never loaded")
    ));
    assert!(poll!(second.as_mut()).is_pending(), "Second caller didn't join");

    release.send(()).unwrap();
    let (first, second) = futures::join!(first, second);
    assert!(!first.unwrap().debug_info.did_dedup);
    let second = second.unwrap();
    assert!(second.debug_info.did_dedup);
    assert_eq!(second.data, "Acme");
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert_eq!(store.get(1), Some("Acme"));
}

#[tokio::test]
async fn invalidation_during_subscribed_load_requests_refetch() {
    let store = TestStore::default();
    let requested = listen(&store);
    let (release, gate) = oneshot::channel::<()>();
    store.subscribe(1);

    let load = store.fetch_or_serve(1, LIST_ONLY.clone(), list_tags, || async move {
        let _ = gate.await;
        Ok("[Acme]")
    });
    let mutate = async {
        assert!(store.invalidate(&LIST_ONLY).is_empty());
        release.send(()).unwrap();
    };
    let (served, _) = futures::join!(load, mutate);

    assert!(served.unwrap().invalidated_in_flight);
    assert_eq!(*requested.lock(), vec![1]);
}
