use crate::{
    store::data::{InMemoryData, Ticket},
    types::{ListenerId, Served, StoreOptions, TagSet}
};
use fnv::FnvHashMap;
use parking_lot::Mutex;
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{debug, trace};

type RefetchListener = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_id: FnvHashMap<u64, RefetchListener>
}

/// The process-wide result store.
///
/// Results are keyed by request fingerprint and indexed by the tags they provide.
/// All bookkeeping happens inside a single lock, so no caller can ever observe a
/// partially applied write or invalidation. The lock is never held across an
/// `.await`.
///
/// The store is meant to be created once by the application root and shared by
/// reference (usually an `Arc<Store<_, _>>`) with everything that reads or writes
/// through it. Everyone holding subscriptions registers a refetch listener, which is told
/// about every subscribed key that goes stale, whoever caused it.
pub struct Store<T, E> {
    data: Mutex<InMemoryData<T, E>>,
    listeners: Mutex<Listeners>,
    options: StoreOptions
}

impl<T: Clone, E: Clone> Default for Store<T, E> {
    fn default() -> Self {
        Store::new(StoreOptions::default())
    }
}

impl<T: Clone, E: Clone> Store<T, E> {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            data: Mutex::new(InMemoryData::new()),
            listeners: Mutex::new(Listeners::default()),
            options
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Serve `key` from the store if a fresh entry exists, otherwise load it.
    ///
    /// # Parameters
    ///
    /// * `key` - The request fingerprint.
    /// * `scope` - Tags every result for `key` is known to provide before it's loaded, e.g.
    /// the entity tag of a single-entity read. Only invalidations touching these keep later
    /// callers from joining the load.
    /// * `provides` - Computes the tags of a loaded value. Called at most once, and only for
    /// results that actually get written. It runs while the store is locked, so it should
    /// be a cheap, pure function of the value.
    /// * `loader` - Produces the network future. Not called at all on a cache hit or when
    /// this call joins another caller's in-flight load.
    ///
    /// Concurrent calls for the same key share a single load. A load whose scope was
    /// invalidated while in flight is never joined; a new load is started instead.
    pub async fn fetch_or_serve<P, L, F>(
        &self,
        key: u64,
        scope: TagSet,
        provides: P,
        loader: L
    ) -> Result<Served<T>, E>
    where
        P: FnOnce(&T) -> TagSet,
        L: FnOnce() -> F,
        F: Future<Output = Result<T, E>>
    {
        self.run(key, scope, true, provides, loader).await
    }

    /// Like [`fetch_or_serve`](#method.fetch_or_serve), but always starts a new load.
    /// The new load supersedes any load already in flight for `key`: only the most recently
    /// started load gets to write its result.
    pub async fn refetch<P, L, F>(
        &self,
        key: u64,
        scope: TagSet,
        provides: P,
        loader: L
    ) -> Result<Served<T>, E>
    where
        P: FnOnce(&T) -> TagSet,
        L: FnOnce() -> F,
        F: Future<Output = Result<T, E>>
    {
        self.run(key, scope, false, provides, loader).await
    }

    async fn run<P, L, F>(
        &self,
        key: u64,
        scope: TagSet,
        use_cache: bool,
        provides: P,
        loader: L
    ) -> Result<Served<T>, E>
    where
        P: FnOnce(&T) -> TagSet,
        L: FnOnce() -> F,
        F: Future<Output = Result<T, E>>
    {
        loop {
            let ticket = {
                let mut data = self.data.lock();
                data.collect_garbage(Instant::now(), self.options.gc_grace);
                if use_cache {
                    if let Some(value) = data.fresh(key) {
                        trace!(key, "cache hit");
                        return Ok(Served::cached(value.clone()));
                    }
                }
                data.join_or_begin(key, &scope, use_cache)
            };

            match ticket {
                Ticket::Join(receiver) => match receiver.await {
                    Ok(result) => {
                        trace!(key, "joined in-flight load");
                        return result.map(|value| Served::network(value, true, false));
                    }
                    // The caller that owned the load went away before it finished.
                    Err(_) => {
                        debug!(key, "in-flight load was abandoned, retrying");
                        continue;
                    }
                },
                Ticket::Begin(generation) => {
                    return self.load(key, generation, provides, loader).await;
                }
            }
        }
    }

    async fn load<P, L, F>(
        &self,
        key: u64,
        generation: u64,
        provides: P,
        loader: L
    ) -> Result<Served<T>, E>
    where
        P: FnOnce(&T) -> TagSet,
        L: FnOnce() -> F,
        F: Future<Output = Result<T, E>>
    {
        debug!(key, generation, "cache miss, loading");
        let mut guard = AbandonGuard {
            store: self,
            key,
            generation,
            armed: true
        };
        let result = loader().await;
        guard.armed = false;

        let (waiters, invalidated_in_flight, notify) = {
            let mut data = self.data.lock();
            let finished = data.finish(key, generation);
            let mut invalidated_in_flight = false;
            let mut notify = false;
            if finished.is_latest {
                match &result {
                    Ok(value) => {
                        let tags = provides(value);
                        invalidated_in_flight = tags.intersects(&finished.invalidated);
                        if invalidated_in_flight {
                            debug!(key, %tags, "invalidated while loading, writing as stale");
                        }
                        data.write(key, value.clone(), tags, invalidated_in_flight, Instant::now());
                        notify = invalidated_in_flight
                            && data.subscriber_count(key) > 0
                            && data.request_refetch(key);
                    }
                    Err(_) => {
                        data.mark_failed(key);
                    }
                }
            } else {
                debug!(key, generation, "discarding result of superseded load");
            }
            (finished.waiters, invalidated_in_flight, notify)
        };

        if notify {
            self.notify(&[key]);
        }

        for waiter in waiters {
            // The waiting caller may have been dropped, that's fine.
            let _ = waiter.send(result.clone());
        }

        result.map(|value| Served::network(value, false, invalidated_in_flight))
    }

    /// The fresh value for `key`, if any. Never performs I/O.
    pub fn get(&self, key: u64) -> Option<T> {
        self.data.lock().fresh(key).cloned()
    }

    pub fn contains(&self, key: u64) -> bool {
        self.data.lock().entries.contains_key(&key)
    }

    /// `None` if there is no entry for `key`.
    pub fn is_stale(&self, key: u64) -> Option<bool> {
        self.data.lock().entries.get(&key).map(|entry| entry.stale)
    }

    pub fn tags_of(&self, key: u64) -> Option<TagSet> {
        self.data.lock().entries.get(&key).map(|entry| entry.tags.clone())
    }

    /// Mark every entry tagged with any of `tags` as stale.
    ///
    /// Entries nobody is subscribed to are dropped right away. Subscribed entries that need
    /// a background refetch are reported to every refetch listener and returned. An entry
    /// isn't reported while a refetch for it is already pending or in flight, which makes
    /// invalidating the same tags twice in a row equivalent to doing it once. Once that
    /// refetch finishes, successfully or not, the next invalidation reports it again.
    pub fn invalidate(&self, tags: &TagSet) -> Vec<u64> {
        let mut to_refetch = {
            let mut data = self.data.lock();
            let mut to_refetch = Vec::new();
            let mut dropped = 0usize;
            for key in data.keys_for_tags(tags) {
                if data.subscriber_count(key) > 0 {
                    data.mark_stale(key);
                    if !data.in_flight.contains_key(&key) && data.request_refetch(key) {
                        to_refetch.push(key);
                    }
                } else {
                    data.remove(key);
                    dropped += 1;
                }
            }
            data.record_invalidation(tags);
            debug!(%tags, dropped, refetch = to_refetch.len(), "invalidated");
            to_refetch
        };
        to_refetch.sort_unstable();
        self.notify(&to_refetch);
        to_refetch
    }

    /// Call `listener` with every subscribed key that needs a background refetch, for as
    /// long as the returned id isn't removed again.
    pub fn add_refetch_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(u64) + Send + Sync + 'static
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.by_id.insert(id, Arc::new(listener));
        ListenerId(id)
    }

    pub fn remove_refetch_listener(&self, id: ListenerId) {
        self.listeners.lock().by_id.remove(&id.0);
    }

    // Listeners run without any lock held, so they're free to call back into the store.
    fn notify(&self, keys: &[u64]) {
        if keys.is_empty() {
            return;
        }
        let listeners: Vec<RefetchListener> =
            self.listeners.lock().by_id.values().cloned().collect();
        trace!(keys = keys.len(), listeners = listeners.len(), "requesting refetches");
        for listener in listeners.iter() {
            for key in keys {
                listener(*key);
            }
        }
    }

    /// Register interest in `key`. Returns the new subscriber count.
    pub fn subscribe(&self, key: u64) -> usize {
        self.data.lock().subscribe(key)
    }

    /// Drop interest in `key`. Once nobody is subscribed, the entry becomes eligible for
    /// eviction after the configured grace period. Returns the remaining subscriber count.
    pub fn unsubscribe(&self, key: u64) -> usize {
        self.data.lock().unsubscribe(key, Instant::now())
    }

    pub fn subscriber_count(&self, key: u64) -> usize {
        self.data.lock().subscriber_count(key)
    }

    /// Evict idle entries now instead of waiting for the next load. Returns the number of
    /// evicted entries.
    pub fn collect_garbage(&self) -> usize {
        self.data
            .lock()
            .collect_garbage(Instant::now(), self.options.gc_grace)
    }

    pub fn len(&self) -> usize {
        self.data.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Subscriptions and in-flight loads are left alone.
    pub fn clear(&self) {
        self.data.lock().clear()
    }
}

/// Removes the in-flight record if the loading future is dropped before it completes.
/// Any joined callers see their channel close and retry on their own.
struct AbandonGuard<'a, T, E> {
    store: &'a Store<T, E>,
    key: u64,
    generation: u64,
    armed: bool
}

impl<'a, T, E> Drop for AbandonGuard<'a, T, E> {
    fn drop(&mut self) {
        if self.armed {
            let mut data = self.store.data.lock();
            let finished = data.finish(self.key, self.generation);
            debug!(
                key = self.key,
                waiters = finished.waiters.len(),
                "load abandoned"
            );
        }
    }
}
