//! Fetch double that records every request, and a provider with
//! hand-picked timestamps.

use chrono::{Duration as AgeDuration, Utc};
use color_eyre::Result;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::provider::{CacheProvider, PersistedEntry};
use crate::error::FetchError;
use crate::fetcher::Fetch;

#[derive(Clone, Default)]
pub struct RecordingFetcher {
  calls: Arc<Mutex<Vec<String>>>,
  bodies: Arc<Mutex<HashMap<String, Value>>>,
  failures: Arc<Mutex<HashMap<String, u16>>>,
  delays: Arc<Mutex<VecDeque<Duration>>>,
}

impl RecordingFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Serve `body` for `path` instead of the default echo payload.
  pub fn respond(&self, path: &str, body: Value) {
    self.bodies.lock().unwrap().insert(path.to_string(), body);
  }

  /// Answer `path` with an HTTP error until cleared.
  pub fn fail(&self, path: &str, status: u16) {
    self.failures.lock().unwrap().insert(path.to_string(), status);
  }

  pub fn recover(&self, path: &str) {
    self.failures.lock().unwrap().remove(path);
  }

  /// Delay for the next requests, in order. Later requests default to 10ms.
  pub fn delays(&self, delays: impl IntoIterator<Item = Duration>) {
    self.delays.lock().unwrap().extend(delays);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }
}

impl Fetch for RecordingFetcher {
  fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Value, FetchError>> {
    let call = {
      let mut calls = self.calls.lock().unwrap();
      calls.push(path.to_string());
      calls.len()
    };
    let delay = self
      .delays
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or(Duration::from_millis(10));

    let result = match self.failures.lock().unwrap().get(path) {
      Some(status) => Err(FetchError::Http {
        status: *status,
        url: path.to_string(),
      }),
      None => Ok(
        self
          .bodies
          .lock()
          .unwrap()
          .get(path)
          .cloned()
          .unwrap_or_else(|| json!({ "path": path, "call": call })),
      ),
    };

    Box::pin(async move {
      tokio::time::sleep(delay).await;
      result
    })
  }
}

/// Provider whose payloads were stored a given time ago.
#[derive(Default)]
pub struct AgedProvider {
  entries: Mutex<HashMap<String, PersistedEntry>>,
}

impl AgedProvider {
  pub fn with(key: &str, value: Value, age: AgeDuration) -> Self {
    let provider = Self::default();
    provider.entries.lock().unwrap().insert(
      key.to_string(),
      PersistedEntry {
        value,
        cached_at: Utc::now() - age,
      },
    );
    provider
  }
}

impl CacheProvider for AgedProvider {
  fn load(&self, key: &str) -> Result<Option<PersistedEntry>> {
    Ok(self.entries.lock().unwrap().get(key).cloned())
  }

  fn store(&self, key: &str, value: &Value) -> Result<()> {
    self.entries.lock().unwrap().insert(
      key.to_string(),
      PersistedEntry {
        value: value.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }
}
