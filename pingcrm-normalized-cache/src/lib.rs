//! A tag-invalidated result cache for the pingcrm client.
//!
//! Every cached result is stored under the fingerprint of the request that produced it,
//! together with the set of [`Tag`](./struct.Tag.html)s it provides: one per entity it
//! contains, plus a `LIST` tag for collection results. Mutations invalidate by tag, which
//! marks every overlapping entry stale so that it is refetched before being served again.
//!
//! Besides caching, the store also deduplicates loads: concurrent requests for the same
//! fingerprint share one in-flight load, and only the most recently started load for a
//! fingerprint is allowed to write its result.
//!
//! ```
//! # tokio_test::block_on(async {
//! use pingcrm_normalized_cache::{ResultSource, Store, Tag, TagSet};
//!
//! let store: Store<&'static str, String> = Store::default();
//! let account: TagSet = vec![Tag::entity("accounts", "1")].into_iter().collect();
//! let tags = |_: &&'static str| account.clone();
//!
//! let first = store.fetch_or_serve(1, account.clone(), tags, || async { Ok("Acme") }).await.unwrap();
//! assert_eq!(first.debug_info.source, ResultSource::Network);
//!
//! let second = store.fetch_or_serve(1, account.clone(), tags, || async { Ok("unused") }).await.unwrap();
//! assert_eq!(second.debug_info.source, ResultSource::Cache);
//! assert_eq!(second.data, "Acme");
//! # });
//! ```

mod store;
mod types;

pub use store::Store;
pub use types::{DebugInfo, ListenerId, ResultSource, Served, StoreOptions, Tag, TagId, TagSet};
