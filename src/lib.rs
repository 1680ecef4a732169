//! Client data layer for the construction company's content site.
//!
//! - [`fetcher`]: GET + JSON against the content API
//! - [`swr`]: shared stale-while-revalidate cache with request coalescing
//! - [`site`]: resource hooks for blogs, projects, services and settings
//! - [`reveal`]: view-triggered reveal state for scroll animations

pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod reveal;
pub mod site;
pub mod swr;

pub use error::FetchError;
pub use site::SiteClient;
