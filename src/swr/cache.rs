//! Shared SWR cache: one entry per request key, one in-flight request per key.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::handle::{FromPayload, Swr};
use super::key::QueryKey;
use super::policy::RevalidatePolicy;
use super::provider::{CacheProvider, NoopProvider, PersistedEntry};
use crate::error::FetchError;
use crate::fetcher::Fetch;

/// Outcome of one fetch, shared by every awaiter of that request.
pub type FetchOutcome = Result<Arc<Value>, Arc<FetchError>>;

type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct InFlight {
  seq: u64,
  future: SharedFetch,
}

struct Entry {
  data: Option<Arc<Value>>,
  error: Option<Arc<FetchError>>,
  /// Set on successful fetch, or from the stored timestamp of restored data
  fetched_at: Option<Instant>,
  in_flight: Option<InFlight>,
  /// Sequence of the newest request started for this key
  latest_seq: u64,
  subscribers: usize,
  policy: RevalidatePolicy,
  last_focus: Option<Instant>,
  notify: watch::Sender<u64>,
}

impl Entry {
  fn new(policy: RevalidatePolicy, fallback: Option<PersistedEntry>) -> Self {
    let (notify, _) = watch::channel(0);
    let fetched_at = fallback.as_ref().and_then(restored_at);
    Self {
      data: fallback.map(|persisted| Arc::new(persisted.value)),
      error: None,
      fetched_at,
      in_flight: None,
      latest_seq: 0,
      subscribers: 0,
      policy,
      last_focus: None,
      notify,
    }
  }

  /// Data fetched within the dedupe interval, if any.
  fn fresh_data(&self) -> Option<&Arc<Value>> {
    let fetched_at = self.fetched_at?;
    if fetched_at.elapsed() < self.policy.dedupe_interval {
      self.data.as_ref()
    } else {
      None
    }
  }

  fn bump(&self) {
    self.notify.send_modify(|v| *v = v.wrapping_add(1));
  }
}

/// Map a persisted timestamp onto the monotonic clock.
///
/// Timestamps in the future, or older than the clock can represent, count
/// as stale.
fn restored_at(persisted: &PersistedEntry) -> Option<Instant> {
  let age = (chrono::Utc::now() - persisted.cached_at).to_std().ok()?;
  Instant::now().checked_sub(age)
}

/// Point-in-time view of a cache entry.
#[derive(Debug, Clone, Default)]
pub struct EntryState {
  pub data: Option<Arc<Value>>,
  pub error: Option<Arc<FetchError>>,
  pub is_validating: bool,
}

/// What `trigger` decided for a key.
enum Revalidation {
  /// Entry is inside its dedupe interval
  Fresh(Arc<Value>),
  /// A request is running (possibly one that was already in flight)
  Pending(SharedFetch),
  /// No request could be started
  Failed(Arc<FetchError>),
}

struct Entries {
  map: Mutex<HashMap<String, Entry>>,
  next_seq: AtomicU64,
}

impl Entries {
  fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
    // A panic while holding the lock cannot leave an entry half-written
    self
      .map
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Record a finished request. Results of superseded requests are dropped.
  fn settle(&self, provider: &dyn CacheProvider, path: &str, seq: u64, outcome: &FetchOutcome) {
    let persist = {
      let mut entries = self.lock();
      let Some(entry) = entries.get_mut(path) else {
        return;
      };

      if entry.in_flight.as_ref().is_some_and(|f| f.seq == seq) {
        entry.in_flight = None;
      }

      if seq != entry.latest_seq {
        debug!(key = %path, seq, latest = entry.latest_seq, "discarding superseded response");
        return;
      }

      let persist = match outcome {
        Ok(data) => {
          entry.data = Some(Arc::clone(data));
          entry.error = None;
          entry.fetched_at = Some(Instant::now());
          debug!(key = %path, "fetch finished");
          Some(Arc::clone(data))
        }
        Err(error) => {
          entry.error = Some(Arc::clone(error));
          warn!(key = %path, "fetch failed: {}", error);
          None
        }
      };
      entry.bump();
      persist
    };

    if let Some(data) = persist {
      if let Err(e) = provider.store(path, &data) {
        warn!(key = %path, "cache provider store failed: {}", e);
      }
    }
  }
}

/// Cache shared by every resource hook.
///
/// Cloning is cheap; clones share entries. Methods that may start a fetch
/// spawn onto the current tokio runtime; called outside one, the key reports
/// [`FetchError::NoRuntime`] instead.
#[derive(Clone)]
pub struct SwrCache {
  fetcher: Arc<dyn Fetch>,
  provider: Arc<dyn CacheProvider>,
  focus_throttle: Duration,
  entries: Arc<Entries>,
}

impl SwrCache {
  /// Create a cache that resolves keys with the given fetcher.
  pub fn new(fetcher: impl Fetch) -> Self {
    Self {
      fetcher: Arc::new(fetcher),
      provider: Arc::new(NoopProvider),
      focus_throttle: Duration::from_secs(5),
      entries: Arc::new(Entries {
        map: Mutex::new(HashMap::new()),
        next_seq: AtomicU64::new(1),
      }),
    }
  }

  /// Use a provider for fallback data and persistence.
  pub fn with_provider(mut self, provider: impl CacheProvider + 'static) -> Self {
    self.provider = Arc::new(provider);
    self
  }

  /// Minimum time between two focus revalidations of the same key.
  pub fn with_focus_throttle(mut self, throttle: Duration) -> Self {
    self.focus_throttle = throttle;
    self
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
    self.entries.lock()
  }

  /// Subscribe to a key, starting a fetch unless a fresh entry exists.
  ///
  /// Restored provider data counts as fresh while its stored timestamp is
  /// inside the key's dedupe interval.
  ///
  /// The returned handle keeps the entry alive and is notified on every
  /// change. Dropping it stops notifications.
  pub fn subscribe<K, D>(&self, key: &K, policy: RevalidatePolicy) -> Swr<D>
  where
    K: QueryKey + ?Sized,
    D: FromPayload,
  {
    let path = key.path();
    let fallback = self.load_fallback(&path);

    let receiver = {
      let mut entries = self.lock();
      collect_garbage(&mut entries);

      let entry = entries
        .entry(path.clone())
        .or_insert_with(|| Entry::new(policy, fallback));
      entry.subscribers += 1;
      entry.policy = policy;
      entry.notify.subscribe()
    };

    debug!(key = %path, what = %key.description(), "subscribe");
    self.trigger(&path, false);

    Swr::new(self.clone(), path, receiver)
  }

  fn load_fallback(&self, path: &str) -> Option<PersistedEntry> {
    if self.lock().contains_key(path) {
      return None;
    }
    match self.provider.load(path) {
      Ok(Some(persisted)) => {
        debug!(key = %path, cached_at = %persisted.cached_at, "restored fallback data");
        Some(persisted)
      }
      Ok(None) => None,
      Err(e) => {
        warn!(key = %path, "cache provider load failed: {}", e);
        None
      }
    }
  }

  pub(crate) fn release(&self, path: &str) {
    if let Some(entry) = self.lock().get_mut(path) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
    }
  }

  /// Revalidate a key and wait for the result.
  ///
  /// Without `force`, a fresh entry is returned as-is and an in-flight
  /// request is joined. With `force`, a new request is always issued.
  pub async fn revalidate(&self, path: &str, force: bool) -> FetchOutcome {
    match self.trigger(path, force) {
      Revalidation::Fresh(data) => Ok(data),
      Revalidation::Pending(request) => request.await,
      Revalidation::Failed(error) => Err(error),
    }
  }

  /// Decide whether `path` needs a request and start it if so.
  fn trigger(&self, path: &str, force: bool) -> Revalidation {
    let runtime = Handle::try_current();
    let (runtime, request) = {
      let mut entries = self.lock();
      let entry = entries
        .entry(path.to_string())
        .or_insert_with(|| Entry::new(RevalidatePolicy::default(), None));

      if !force {
        if let Some(in_flight) = &entry.in_flight {
          debug!(key = %path, "joining in-flight request");
          return Revalidation::Pending(in_flight.future.clone());
        }
        if let Some(data) = entry.fresh_data() {
          debug!(key = %path, "cache hit within dedupe interval");
          return Revalidation::Fresh(Arc::clone(data));
        }
      }

      let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(_) => {
          let error = Arc::new(FetchError::NoRuntime);
          warn!(key = %path, "{}", error);
          entry.error = Some(Arc::clone(&error));
          entry.bump();
          return Revalidation::Failed(error);
        }
      };

      let seq = self.entries.next_seq.fetch_add(1, Ordering::Relaxed);
      let request = self.start_fetch(path, seq);
      entry.latest_seq = seq;
      entry.in_flight = Some(InFlight {
        seq,
        future: request.clone(),
      });
      entry.bump();
      (runtime, request)
    };

    debug!(key = %path, force, "fetch started");
    runtime.spawn(request.clone());
    Revalidation::Pending(request)
  }

  /// The request holds the entries weakly: an entry stores its own in-flight
  /// future, and a dropped cache must not be kept alive by it.
  fn start_fetch(&self, path: &str, seq: u64) -> SharedFetch {
    let entries: Weak<Entries> = Arc::downgrade(&self.entries);
    let provider = Arc::clone(&self.provider);
    let path = path.to_string();
    let request = self.fetcher.fetch(&path);

    async move {
      let outcome: FetchOutcome = request.await.map(Arc::new).map_err(Arc::new);
      if let Some(entries) = entries.upgrade() {
        entries.settle(provider.as_ref(), &path, seq, &outcome);
      }
      outcome
    }
    .boxed()
    .shared()
  }

  /// Current state of a key.
  pub fn state(&self, path: &str) -> EntryState {
    self
      .lock()
      .get(path)
      .map(|entry| EntryState {
        data: entry.data.clone(),
        error: entry.error.clone(),
        is_validating: entry.in_flight.is_some(),
      })
      .unwrap_or_default()
  }

  /// The host regained focus: revalidate subscribed keys that opt in.
  ///
  /// Respects each key's dedupe interval and the focus throttle. Returns the
  /// number of keys considered.
  pub fn focus(&self) -> usize {
    let now = Instant::now();
    let keys: Vec<String> = {
      let mut entries = self.lock();
      let mut keys = Vec::new();
      for (key, entry) in entries.iter_mut() {
        if entry.subscribers == 0 || !entry.policy.revalidate_on_focus {
          continue;
        }
        if let Some(last) = entry.last_focus {
          if now.duration_since(last) < self.focus_throttle {
            continue;
          }
        }
        entry.last_focus = Some(now);
        keys.push(key.clone());
      }
      keys
    };

    for key in &keys {
      self.trigger(key, false);
    }
    keys.len()
  }

  /// The host came back online: revalidate subscribed keys that opt in.
  pub fn reconnect(&self) -> usize {
    let keys: Vec<String> = self
      .lock()
      .iter()
      .filter(|(_, entry)| entry.subscribers > 0 && entry.policy.revalidate_on_reconnect)
      .map(|(key, _)| key.clone())
      .collect();

    for key in &keys {
      self.trigger(key, false);
    }
    keys.len()
  }

  /// Drop entries nobody needs anymore.
  pub fn collect_garbage(&self) {
    collect_garbage(&mut self.lock());
  }

  /// Number of live entries.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// An entry is kept while it has subscribers, a request in flight, or data
/// still inside its dedupe interval.
fn collect_garbage(entries: &mut HashMap<String, Entry>) {
  entries.retain(|key, entry| {
    let keep = entry.subscribers > 0 || entry.in_flight.is_some() || entry.fresh_data().is_some();
    if !keep {
      debug!(key = %key, "evicting unused entry");
    }
    keep
  });
}

impl std::fmt::Debug for SwrCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SwrCache")
      .field("entries", &self.len())
      .field("focus_throttle", &self.focus_throttle)
      .finish_non_exhaustive()
  }
}
