//! Resource hooks for the construction site's content API.
//!
//! `SiteClient` plays the role the data-fetching hooks play in the page
//! layer: each method turns a filter object into a canonical request key and
//! subscribes to the shared SWR cache with that resource's policy.

mod client;
mod keys;
mod types;

pub use client::SiteClient;
pub use keys::{BlogFilters, ProjectFilters, ServiceFilters, SiteQueryKey};
pub use types::{BlogList, ProjectList, ServiceList, Settings};
