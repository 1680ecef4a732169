//! Content API client with the shared SWR cache behind every resource.

use color_eyre::Result;

use crate::config::Config;
use crate::fetcher::HttpFetcher;
use crate::swr::{RevalidatePolicy, SqliteProvider, Swr, SwrCache};

use super::keys::{BlogFilters, ProjectFilters, ServiceFilters, SiteQueryKey};
use super::types::{BlogList, ProjectList, ServiceList, Settings};

/// Entry point for the resource hooks.
///
/// Clones share one cache, so two pages asking for the same resource with
/// the same filters share one request.
///
/// The hooks spawn their requests, so call them from inside a tokio runtime.
/// Outside one, the returned handle reports [`FetchError::NoRuntime`].
///
/// [`FetchError::NoRuntime`]: crate::error::FetchError::NoRuntime
#[derive(Clone, Debug)]
pub struct SiteClient {
  cache: SwrCache,
  content_policy: RevalidatePolicy,
  settings_policy: RevalidatePolicy,
}

impl SiteClient {
  /// Create a client over an existing cache with the built-in policies.
  pub fn new(cache: SwrCache) -> Self {
    Self {
      cache,
      content_policy: RevalidatePolicy::content(),
      settings_policy: RevalidatePolicy::settings(),
    }
  }

  /// Build the HTTP fetcher, cache and provider described by `config`.
  pub fn from_config(config: &Config) -> Result<Self> {
    let fetcher = HttpFetcher::new(config.api_base_url()?);
    let mut cache = SwrCache::new(fetcher).with_focus_throttle(config.focus_throttle());

    if config.cache.persist {
      let provider = SqliteProvider::open(config.cache.path.as_deref())?;
      cache = cache.with_provider(provider);
    }

    Ok(Self::new(cache).with_policies(config.content_policy(), config.settings_policy()))
  }

  pub fn with_policies(mut self, content: RevalidatePolicy, settings: RevalidatePolicy) -> Self {
    self.content_policy = content;
    self.settings_policy = settings;
    self
  }

  /// The shared cache, for focus/reconnect events and manual revalidation.
  pub fn cache(&self) -> &SwrCache {
    &self.cache
  }

  /// Blog posts, optionally filtered by status and limited.
  pub fn blogs(&self, filters: BlogFilters) -> Swr<BlogList> {
    self
      .cache
      .subscribe(&SiteQueryKey::Blogs(filters), self.content_policy)
  }

  /// Projects, optionally only featured ones and limited.
  pub fn projects(&self, filters: ProjectFilters) -> Swr<ProjectList> {
    self
      .cache
      .subscribe(&SiteQueryKey::Projects(filters), self.content_policy)
  }

  /// Services, optionally only featured ones.
  pub fn services(&self, filters: ServiceFilters) -> Swr<ServiceList> {
    self
      .cache
      .subscribe(&SiteQueryKey::Services(filters), self.content_policy)
  }

  /// Site-wide settings (contact details, company info).
  pub fn settings(&self) -> Swr<Settings> {
    self
      .cache
      .subscribe(&SiteQueryKey::Settings, self.settings_policy)
  }
}
