use crate::types::{Tag, TagSet};
use fnv::{FnvHashMap, FnvHashSet};
use futures::channel::oneshot;
use std::{
    mem,
    time::{Duration, Instant}
};

pub(crate) type Waiter<T, E> = oneshot::Sender<Result<T, E>>;

pub(crate) struct Entry<T> {
    pub(crate) value: T,
    pub(crate) tags: TagSet,
    pub(crate) stale: bool,
    /// A background refetch was requested and hasn't finished yet.
    pub(crate) refetch_pending: bool,
    /// Set while nobody is subscribed. Used for lazy eviction.
    pub(crate) idle_since: Option<Instant>
}

pub(crate) struct InFlight<T, E> {
    pub(crate) generation: u64,
    pub(crate) waiters: Vec<Waiter<T, E>>,
    /// Tags the result is known to provide, given when the load started.
    pub(crate) scope: TagSet,
    /// Every tag invalidated since this load started.
    pub(crate) invalidated: TagSet
}

pub(crate) enum Ticket<T, E> {
    Join(oneshot::Receiver<Result<T, E>>),
    Begin(u64)
}

pub(crate) struct Finished<T, E> {
    pub(crate) waiters: Vec<Waiter<T, E>>,
    pub(crate) is_latest: bool,
    pub(crate) invalidated: TagSet
}

pub(crate) struct InMemoryData<T, E> {
    pub(crate) entries: FnvHashMap<u64, Entry<T>>,
    pub(crate) tag_index: FnvHashMap<Tag, FnvHashSet<u64>>,
    pub(crate) subscribers: FnvHashMap<u64, usize>,
    pub(crate) in_flight: FnvHashMap<u64, InFlight<T, E>>,
    /// Waiters of loads that were replaced by a newer load for the same key, by generation.
    pub(crate) superseded: FnvHashMap<u64, Vec<Waiter<T, E>>>,
    next_generation: u64
}

impl<T, E> InMemoryData<T, E> {
    pub(crate) fn new() -> Self {
        InMemoryData {
            entries: FnvHashMap::default(),
            tag_index: FnvHashMap::default(),
            subscribers: FnvHashMap::default(),
            in_flight: FnvHashMap::default(),
            superseded: FnvHashMap::default(),
            next_generation: 0
        }
    }

    pub(crate) fn fresh(&self, key: u64) -> Option<&T> {
        self.entries
            .get(&key)
            .filter(|entry| !entry.stale)
            .map(|entry| &entry.value)
    }

    pub(crate) fn subscriber_count(&self, key: u64) -> usize {
        self.subscribers.get(&key).copied().unwrap_or(0)
    }

    /// Join the in-flight load for `key` unless its scope has been invalidated, otherwise
    /// start a new one. A new load supersedes any older load for the same key.
    pub(crate) fn join_or_begin(
        &mut self,
        key: u64,
        scope: &TagSet,
        allow_join: bool
    ) -> Ticket<T, E> {
        if allow_join {
            if let Some(in_flight) = self.in_flight.get_mut(&key) {
                if !in_flight.invalidated.intersects(&in_flight.scope) {
                    let (sender, receiver) = oneshot::channel();
                    in_flight.waiters.push(sender);
                    return Ticket::Join(receiver);
                }
            }
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        let previous = self.in_flight.insert(
            key,
            InFlight {
                generation,
                waiters: Vec::new(),
                scope: scope.clone(),
                invalidated: TagSet::new()
            }
        );
        if let Some(previous) = previous {
            self.superseded.insert(previous.generation, previous.waiters);
        }
        Ticket::Begin(generation)
    }

    pub(crate) fn finish(&mut self, key: u64, generation: u64) -> Finished<T, E> {
        let is_latest = self
            .in_flight
            .get(&key)
            .map_or(false, |in_flight| in_flight.generation == generation);
        let latest = if is_latest {
            self.in_flight.remove(&key)
        } else {
            None
        };

        match latest {
            Some(in_flight) => Finished {
                waiters: in_flight.waiters,
                is_latest: true,
                invalidated: in_flight.invalidated
            },
            None => Finished {
                waiters: self.superseded.remove(&generation).unwrap_or_default(),
                is_latest: false,
                invalidated: TagSet::new()
            }
        }
    }

    pub(crate) fn write(&mut self, key: u64, value: T, tags: TagSet, stale: bool, now: Instant) {
        self.unindex(key);
        for tag in tags.iter() {
            self.tag_index.entry(tag.clone()).or_default().insert(key);
        }
        let idle_since = if self.subscriber_count(key) == 0 {
            Some(now)
        } else {
            None
        };
        self.entries.insert(
            key,
            Entry {
                value,
                tags,
                stale,
                refetch_pending: false,
                idle_since
            }
        );
    }

    pub(crate) fn mark_stale(&mut self, key: u64) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.stale = true;
        }
    }

    /// The latest load failed. The previous value stays around, stale, and the next
    /// invalidation may request a refetch again.
    pub(crate) fn mark_failed(&mut self, key: u64) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.stale = true;
            entry.refetch_pending = false;
        }
    }

    /// Returns `true` if the entry exists and no refetch was pending for it yet.
    pub(crate) fn request_refetch(&mut self, key: u64) -> bool {
        match self.entries.get_mut(&key) {
            Some(entry) => !mem::replace(&mut entry.refetch_pending, true),
            None => false
        }
    }

    pub(crate) fn remove(&mut self, key: u64) -> Option<Entry<T>> {
        self.unindex(key);
        self.entries.remove(&key)
    }

    fn unindex(&mut self, key: u64) {
        let tags = match self.entries.get(&key) {
            Some(entry) => entry.tags.clone(),
            None => return
        };
        for tag in tags {
            let now_empty = match self.tag_index.get_mut(&tag) {
                Some(keys) => {
                    keys.remove(&key);
                    keys.is_empty()
                }
                None => false
            };
            if now_empty {
                self.tag_index.remove(&tag);
            }
        }
    }

    pub(crate) fn keys_for_tags(&self, tags: &TagSet) -> FnvHashSet<u64> {
        let mut keys = FnvHashSet::default();
        for tag in tags.iter() {
            if let Some(tagged) = self.tag_index.get(tag) {
                keys.extend(tagged.iter().copied());
            }
        }
        keys
    }

    pub(crate) fn record_invalidation(&mut self, tags: &TagSet) {
        for in_flight in self.in_flight.values_mut() {
            in_flight.invalidated.extend(tags.iter());
        }
    }

    pub(crate) fn subscribe(&mut self, key: u64) -> usize {
        let count = self.subscribers.entry(key).or_insert(0);
        *count += 1;
        let count = *count;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.idle_since = None;
        }
        count
    }

    pub(crate) fn unsubscribe(&mut self, key: u64, now: Instant) -> usize {
        let remaining = match self.subscribers.get_mut(&key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return 0
        };
        if remaining == 0 {
            self.subscribers.remove(&key);
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.idle_since = Some(now);
            }
        }
        remaining
    }

    /// Evicts every unsubscribed entry that has been idle for at least `grace`.
    pub(crate) fn collect_garbage(&mut self, now: Instant, grace: Duration) -> usize {
        let expired: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| match entry.idle_since {
                Some(idle_since) => now.saturating_duration_since(idle_since) >= grace,
                None => false
            })
            .map(|(key, _)| *key)
            .collect();
        for key in expired.iter() {
            self.remove(*key);
        }
        expired.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.tag_index.clear();
    }
}
