//! Cache keys.

/// A request that can be cached.
///
/// The canonical path (resource path plus serialized filters) is both the
/// URL suffix handed to the fetcher and the key in the shared cache, so two
/// requests with the same filters always land on the same entry.
pub trait QueryKey {
  /// Canonical request path, e.g. `/projects?featured=true&limit=3`.
  fn path(&self) -> String;

  /// Human readable description for logs.
  fn description(&self) -> String;
}

impl QueryKey for str {
  fn path(&self) -> String {
    self.to_string()
  }

  fn description(&self) -> String {
    self.to_string()
  }
}

impl QueryKey for String {
  fn path(&self) -> String {
    self.clone()
  }

  fn description(&self) -> String {
    self.clone()
  }
}
