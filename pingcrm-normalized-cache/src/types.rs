use std::{
    collections::{btree_set, BTreeSet},
    fmt,
    iter::FromIterator,
    time::Duration
};

/// The identity part of a [`Tag`](./struct.Tag.html).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagId {
    /// A single entity, identified by its opaque ID.
    Id(String),
    /// Every list of the tagged entity type.
    List
}

/// An invalidation label attached to a cached result.
///
/// A tag is either an `(entity type, id)` pair or an entity-type-wide `LIST` tag.
/// The entity type is a static string such as `"accounts"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub kind: &'static str,
    pub id: TagId
}

impl Tag {
    /// A tag for one specific entity.
    pub fn entity<S: Into<String>>(kind: &'static str, id: S) -> Self {
        Tag {
            kind,
            id: TagId::Id(id.into())
        }
    }

    /// The list tag of an entity type.
    pub fn list(kind: &'static str) -> Self {
        Tag {
            kind,
            id: TagId::List
        }
    }

    pub fn is_list(&self) -> bool {
        self.id == TagId::List
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            TagId::Id(id) => write!(f, "{}:{}", self.kind, id),
            TagId::List => write!(f, "{}:LIST", self.kind)
        }
    }
}

/// An ordered set of tags. Ordering only matters for stable debug output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    /// Returns `true` if at least one tag is present in both sets.
    pub fn intersects(&self, other: &TagSet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|tag| large.contains(tag))
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl<'a> Extend<&'a Tag> for TagSet {
    fn extend<I: IntoIterator<Item = &'a Tag>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().cloned())
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        TagSet(iter.into_iter().collect())
    }
}

impl IntoIterator for TagSet {
    type Item = Tag;
    type IntoIter = btree_set::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = btree_set::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "]")
    }
}

/// Options to pass to the store.
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// How long an entry without subscribers is kept around before it becomes
    /// eligible for eviction. Eviction happens lazily on the next store access.
    pub gc_grace: Duration
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            gc_grace: Duration::from_secs(60)
        }
    }
}

/// Identifies a refetch listener registered with a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Where a result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Network
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    pub source: ResultSource,
    /// `true` if this caller piggybacked on another caller's in-flight load.
    pub did_dedup: bool
}

/// A value handed out by the store, along with some info on how it was obtained.
#[derive(Clone, Debug)]
pub struct Served<T> {
    pub data: T,
    pub debug_info: DebugInfo,
    /// The entry was invalidated while this load was in flight, so it was written
    /// as stale. Active subscribers should refetch.
    pub invalidated_in_flight: bool
}

impl<T> Served<T> {
    pub(crate) fn cached(data: T) -> Self {
        Served {
            data,
            debug_info: DebugInfo {
                source: ResultSource::Cache,
                did_dedup: false
            },
            invalidated_in_flight: false
        }
    }

    pub(crate) fn network(data: T, did_dedup: bool, invalidated_in_flight: bool) -> Self {
        Served {
            data,
            debug_info: DebugInfo {
                source: ResultSource::Network,
                did_dedup
            },
            invalidated_in_flight
        }
    }
}
