//! Filters and canonical request keys for the content resources.

use url::form_urlencoded;

use crate::swr::QueryKey;

/// Filters for `/blogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogFilters {
  /// Publication status, e.g. "published" or "draft"
  pub status: Option<String>,
  pub limit: Option<u32>,
}

impl BlogFilters {
  pub fn status(mut self, status: impl Into<String>) -> Self {
    self.status = Some(status.into());
    self
  }

  pub fn limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }
}

/// Filters for `/projects`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilters {
  pub featured: Option<bool>,
  pub limit: Option<u32>,
}

impl ProjectFilters {
  pub fn featured(mut self, featured: bool) -> Self {
    self.featured = Some(featured);
    self
  }

  pub fn limit(mut self, limit: u32) -> Self {
    self.limit = Some(limit);
    self
  }
}

/// Filters for `/services`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilters {
  pub featured: Option<bool>,
}

impl ServiceFilters {
  pub fn featured(mut self, featured: bool) -> Self {
    self.featured = Some(featured);
    self
  }
}

/// Query key types for the content API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteQueryKey {
  Blogs(BlogFilters),
  Projects(ProjectFilters),
  Services(ServiceFilters),
  Settings,
}

impl SiteQueryKey {
  fn resource(&self) -> &'static str {
    match self {
      Self::Blogs(_) => "/blogs",
      Self::Projects(_) => "/projects",
      Self::Services(_) => "/services",
      Self::Settings => "/settings",
    }
  }

  /// Set filters in fixed field order; unset filters are omitted.
  fn params(&self) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    match self {
      Self::Blogs(f) => {
        if let Some(status) = &f.status {
          params.push(("status", status.clone()));
        }
        if let Some(limit) = f.limit {
          params.push(("limit", limit.to_string()));
        }
      }
      Self::Projects(f) => {
        if let Some(featured) = f.featured {
          params.push(("featured", featured.to_string()));
        }
        if let Some(limit) = f.limit {
          params.push(("limit", limit.to_string()));
        }
      }
      Self::Services(f) => {
        if let Some(featured) = f.featured {
          params.push(("featured", featured.to_string()));
        }
      }
      Self::Settings => {}
    }
    params
  }
}

impl QueryKey for SiteQueryKey {
  fn path(&self) -> String {
    let params = self.params();
    if params.is_empty() {
      return self.resource().to_string();
    }

    let query = form_urlencoded::Serializer::new(String::new())
      .extend_pairs(params)
      .finish();
    format!("{}?{}", self.resource(), query)
  }

  fn description(&self) -> String {
    match self {
      Self::Blogs(f) => match &f.status {
        Some(status) => format!("{} blog posts", status),
        None => "blog posts".to_string(),
      },
      Self::Projects(f) if f.featured == Some(true) => "featured projects".to_string(),
      Self::Projects(_) => "projects".to_string(),
      Self::Services(f) if f.featured == Some(true) => "featured services".to_string(),
      Self::Services(_) => "services".to_string(),
      Self::Settings => "site settings".to_string(),
    }
  }
}
