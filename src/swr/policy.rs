//! Per-resource revalidation policy.

use std::time::Duration;

/// How eagerly a cached key is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevalidatePolicy {
  /// Window after a successful fetch during which no new request is issued
  pub dedupe_interval: Duration,
  /// Refresh when the host regains focus
  pub revalidate_on_focus: bool,
  /// Refresh when the host comes back online
  pub revalidate_on_reconnect: bool,
}

impl RevalidatePolicy {
  /// Content lists (blogs, projects, services): 60s, no focus refresh.
  pub const fn content() -> Self {
    Self {
      dedupe_interval: Duration::from_secs(60),
      revalidate_on_focus: false,
      revalidate_on_reconnect: true,
    }
  }

  /// Site settings: 30s, refreshed on focus.
  pub const fn settings() -> Self {
    Self {
      dedupe_interval: Duration::from_secs(30),
      revalidate_on_focus: true,
      revalidate_on_reconnect: true,
    }
  }

  pub fn with_dedupe_interval(mut self, interval: Duration) -> Self {
    self.dedupe_interval = interval;
    self
  }

  pub fn with_revalidate_on_focus(mut self, enabled: bool) -> Self {
    self.revalidate_on_focus = enabled;
    self
  }

  pub fn with_revalidate_on_reconnect(mut self, enabled: bool) -> Self {
    self.revalidate_on_reconnect = enabled;
    self
  }
}

impl Default for RevalidatePolicy {
  fn default() -> Self {
    Self::content()
  }
}
