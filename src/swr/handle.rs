//! Subscriber handle returned by the resource hooks.
//!
//! A `Swr<D>` is the Rust shape of a data-fetching hook result: it reads the
//! shared cache entry for its key, decodes the payload into `D`, and can be
//! awaited for changes.
//!
//! # Example
//!
//! ```ignore
//! let mut projects = client.projects(ProjectFilters::default().featured(true).limit(3));
//!
//! // Wait for the first settled state
//! let state = projects.ready().await;
//! if state.is_error {
//!     // keep rendering whatever `state.data` holds
//! }
//!
//! // Force a refresh, ignoring the dedupe interval
//! projects.mutate().await?;
//! ```

use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;

use super::cache::SwrCache;
use crate::error::FetchError;

/// Resource data decoded from a cached JSON payload.
///
/// `Default` is what a hook shows before the first successful load.
pub trait FromPayload: Clone + Default + Send + Sync + 'static {
  fn from_payload(payload: &Arc<Value>) -> Result<Self, serde_json::Error>;
}

/// Undecoded payload, shared by reference.
impl FromPayload for Arc<Value> {
  fn from_payload(payload: &Arc<Value>) -> Result<Self, serde_json::Error> {
    Ok(Arc::clone(payload))
  }
}

/// Snapshot of a hook's state.
#[derive(Debug, Clone)]
pub struct SwrState<D> {
  pub data: D,
  /// `data` holds a decoded payload (fetched or restored), not `D::default()`
  pub has_data: bool,
  /// No value cached yet and a request is in flight
  pub is_loading: bool,
  /// A request is in flight, with or without cached data
  pub is_validating: bool,
  /// The last request failed (or its payload had the wrong shape)
  pub is_error: bool,
  pub error: Option<Arc<FetchError>>,
}

impl<D> SwrState<D> {
  /// The data, unless the last request failed with nothing to fall back on.
  ///
  /// Stale data behind a failed revalidation is still `Ok`.
  pub fn into_result(self) -> Result<D, Arc<FetchError>> {
    match self.error {
      Some(error) if !self.has_data => Err(error),
      _ => Ok(self.data),
    }
  }
}

/// Subscription to one cache key.
pub struct Swr<D> {
  cache: SwrCache,
  key: String,
  receiver: watch::Receiver<u64>,
  _data: PhantomData<fn() -> D>,
}

impl<D: FromPayload> Swr<D> {
  pub(crate) fn new(cache: SwrCache, key: String, receiver: watch::Receiver<u64>) -> Self {
    Self {
      cache,
      key,
      receiver,
      _data: PhantomData,
    }
  }

  /// The canonical request key this handle is bound to.
  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn state(&self) -> SwrState<D> {
    let entry = self.cache.state(&self.key);
    let is_loading = entry.data.is_none() && entry.is_validating;

    let (data, has_data, decode_error) = match entry.data.as_ref().map(D::from_payload) {
      Some(Ok(data)) => (data, true, None),
      Some(Err(e)) => (D::default(), false, Some(Arc::new(FetchError::Parse(e)))),
      None => (D::default(), false, None),
    };
    let error = entry.error.or(decode_error);

    SwrState {
      data,
      has_data,
      is_loading,
      is_validating: entry.is_validating,
      is_error: error.is_some(),
      error,
    }
  }

  pub fn data(&self) -> D {
    self.state().data
  }

  pub fn is_loading(&self) -> bool {
    self.state().is_loading
  }

  pub fn is_error(&self) -> bool {
    self.state().is_error
  }

  pub fn error(&self) -> Option<Arc<FetchError>> {
    self.state().error
  }

  /// Revalidate now, bypassing the dedupe interval.
  pub async fn mutate(&self) -> Result<D, Arc<FetchError>> {
    let payload = self.cache.revalidate(&self.key, true).await?;
    D::from_payload(&payload).map_err(|e| Arc::new(FetchError::Parse(e)))
  }

  /// Wait for the next change to this key.
  ///
  /// Returns `false` if the entry was dropped from the cache.
  pub async fn changed(&mut self) -> bool {
    self.receiver.changed().await.is_ok()
  }

  /// Wait until the hook is no longer loading.
  pub async fn ready(&mut self) -> SwrState<D> {
    loop {
      let state = self.state();
      if !state.is_loading || !self.changed().await {
        return state;
      }
    }
  }

  /// Settle, making sure this subscription issued a request when `force` is
  /// set.
  ///
  /// A request already started by `subscribe` is reused rather than
  /// superseded; otherwise (fresh or restored data) one is forced.
  pub async fn resolve(&mut self, force: bool) -> SwrState<D> {
    if force && !self.state().is_validating {
      // Failures are reported through the settled state
      let _ = self.mutate().await;
    }
    self.settled().await
  }

  /// Wait until no request is in flight for this key.
  ///
  /// Unlike [`Swr::ready`], this also waits out a revalidation running
  /// behind cached or restored data.
  pub async fn settled(&mut self) -> SwrState<D> {
    loop {
      let state = self.state();
      if !state.is_validating || !self.changed().await {
        return state;
      }
    }
  }
}

impl<D> Drop for Swr<D> {
  fn drop(&mut self) {
    self.cache.release(&self.key);
  }
}

impl<D> std::fmt::Debug for Swr<D> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Swr")
      .field("key", &self.key)
      .finish_non_exhaustive()
  }
}
