//! Stale-while-revalidate cache for the content API.
//!
//! This module provides the shared, fetcher-agnostic cache behind the
//! resource hooks:
//! - One entry per canonical request key (path plus serialized filters)
//! - Concurrent requests for a key are coalesced into one network call
//! - Entries fetched within their dedupe interval are served without a request
//! - Focus and reconnect events revalidate subscribed keys that opt in
//! - An optional provider restores payloads from a previous run as fallback data

mod cache;
mod handle;
mod key;
mod policy;
mod provider;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{EntryState, FetchOutcome, SwrCache};
pub use handle::{FromPayload, Swr, SwrState};
pub use key::QueryKey;
pub use policy::RevalidatePolicy;
pub use provider::{CacheProvider, NoopProvider, PersistedEntry, SqliteProvider};
