//! View-triggered reveal: per-element visibility driven by intersection
//! entries, for "animate when scrolled into view" effects.
//!
//! The host owns a [`Viewport`] and feeds it intersection entries from its own
//! callback queue. Each observed element gets a [`Reveal`] handle whose state
//! starts `Hidden` and flips to `Visible` once the element crosses the
//! threshold. In one-shot mode the element is then unobserved and stays
//! visible; in continuous mode it goes back to `Hidden` when it leaves.
//!
//! # Example
//!
//! ```ignore
//! let viewport = Viewport::new(Rect::new(0.0, 0.0, 1280.0, 720.0));
//! let hero = viewport.observe(Some(hero_id), RevealOptions::default());
//!
//! // From the host's scroll/layout callback
//! viewport.dispatch(&[IntersectionEntry::new(hero_id, hero_bounds)]);
//!
//! if hero.is_visible() {
//!     // start the animation
//! }
//! ```

mod geometry;

pub use geometry::{MarginValue, Rect, RootMargin, RootMarginError};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

/// Identifier the host uses for an element.
pub type ElementId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
  Hidden,
  Visible,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealOptions {
  /// Fraction of the element (0.0..=1.0) that must be inside the root;
  /// 0 means any intersection
  pub threshold: f64,
  pub root_margin: RootMargin,
  /// Stay visible after the first reveal
  pub trigger_once: bool,
}

impl RevealOptions {
  pub fn threshold(mut self, threshold: f64) -> Self {
    self.threshold = threshold.clamp(0.0, 1.0);
    self
  }

  pub fn root_margin(mut self, margin: RootMargin) -> Self {
    self.root_margin = margin;
    self
  }

  pub fn trigger_once(mut self, once: bool) -> Self {
    self.trigger_once = once;
    self
  }

  /// Whether an element with `bounds` counts as in view of `root`.
  fn is_in_view(&self, root: &Rect, bounds: &Rect) -> bool {
    let root = root.expand(&self.root_margin);
    let Some(overlap) = bounds.intersection(&root) else {
      return false;
    };

    if self.threshold <= 0.0 {
      return true;
    }
    let ratio = if bounds.area() > 0.0 {
      overlap.area() / bounds.area()
    } else {
      1.0
    };
    ratio >= self.threshold
  }
}

impl Default for RevealOptions {
  fn default() -> Self {
    Self {
      threshold: 0.1,
      root_margin: RootMargin::default(),
      trigger_once: true,
    }
  }
}

/// Current layout of one element, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
  pub target: ElementId,
  pub bounds: Rect,
}

impl IntersectionEntry {
  pub fn new(target: ElementId, bounds: Rect) -> Self {
    Self { target, bounds }
  }
}

struct Registration {
  element: ElementId,
  options: RevealOptions,
  state: watch::Sender<ViewState>,
  transitions: Arc<AtomicUsize>,
}

struct ViewportInner {
  root: Rect,
  registrations: HashMap<u64, Registration>,
  next_id: u64,
}

/// Intersection observer for one root rectangle.
#[derive(Clone)]
pub struct Viewport {
  inner: Arc<Mutex<ViewportInner>>,
}

impl Viewport {
  pub fn new(root: Rect) -> Self {
    Self {
      inner: Arc::new(Mutex::new(ViewportInner {
        root,
        registrations: HashMap::new(),
        next_id: 1,
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, ViewportInner> {
    self
      .inner
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Start observing an element.
  ///
  /// Without an element nothing is registered and the handle stays hidden.
  pub fn observe(&self, element: Option<ElementId>, options: RevealOptions) -> Reveal {
    let (sender, receiver) = watch::channel(ViewState::Hidden);
    let transitions = Arc::new(AtomicUsize::new(0));

    let Some(element) = element else {
      return Reveal {
        registration: None,
        state: receiver,
        transitions,
      };
    };

    let id = {
      let mut inner = self.lock();
      let id = inner.next_id;
      inner.next_id += 1;
      inner.registrations.insert(
        id,
        Registration {
          element,
          options,
          state: sender,
          transitions: Arc::clone(&transitions),
        },
      );
      id
    };
    debug!(element, id, "observe");

    Reveal {
      registration: Some((self.clone(), id)),
      state: receiver,
      transitions,
    }
  }

  /// Resize the root (window resize, container change).
  pub fn set_root(&self, root: Rect) {
    self.lock().root = root;
  }

  /// Deliver intersection entries from the host's callback queue.
  pub fn dispatch(&self, entries: &[IntersectionEntry]) {
    let mut inner = self.lock();
    let root = inner.root;
    let mut finished = Vec::new();

    for entry in entries {
      for (id, registration) in inner.registrations.iter() {
        if registration.element != entry.target {
          continue;
        }

        let in_view = registration.options.is_in_view(&root, &entry.bounds);
        let next = match (*registration.state.borrow(), in_view) {
          (ViewState::Hidden, true) => ViewState::Visible,
          (ViewState::Visible, false) if !registration.options.trigger_once => ViewState::Hidden,
          (current, _) => current,
        };

        let changed = registration.state.send_if_modified(|state| {
          if *state == next {
            return false;
          }
          debug!(element = entry.target, id, ?next, "reveal state changed");
          *state = next;
          true
        });
        if changed {
          registration.transitions.fetch_add(1, Ordering::Relaxed);
        }

        if next == ViewState::Visible && registration.options.trigger_once {
          finished.push(*id);
        }
      }
    }

    // One-shot reveals are done; stop observing them
    for id in finished {
      inner.registrations.remove(&id);
    }
  }

  /// Number of active observations.
  pub fn observer_count(&self) -> usize {
    self.lock().registrations.len()
  }

  fn disconnect(&self, id: u64) {
    if self.lock().registrations.remove(&id).is_some() {
      debug!(id, "disconnect");
    }
  }
}

impl Default for Viewport {
  fn default() -> Self {
    Self::new(Rect::default())
  }
}

/// Visibility state of one observed element.
///
/// Dropping the handle disconnects the observer.
pub struct Reveal {
  registration: Option<(Viewport, u64)>,
  state: watch::Receiver<ViewState>,
  transitions: Arc<AtomicUsize>,
}

impl Reveal {
  pub fn state(&self) -> ViewState {
    *self.state.borrow()
  }

  pub fn is_visible(&self) -> bool {
    self.state() == ViewState::Visible
  }

  /// Number of state changes since observing started.
  pub fn transitions(&self) -> usize {
    self.transitions.load(Ordering::Relaxed)
  }

  /// Whether an element was given to observe.
  pub fn is_attached(&self) -> bool {
    self.registration.is_some()
  }

  /// Wait until the element is visible.
  ///
  /// Never resolves for a handle that has no element.
  pub async fn visible(&mut self) {
    if self
      .state
      .wait_for(|state| *state == ViewState::Visible)
      .await
      .is_err()
    {
      // Unattached or disconnected while hidden
      std::future::pending::<()>().await;
    }
  }
}

impl Drop for Reveal {
  fn drop(&mut self) {
    if let Some((viewport, id)) = self.registration.take() {
      viewport.disconnect(id);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  const ROOT: Rect = Rect::new(0.0, 0.0, 1000.0, 800.0);
  const ON_SCREEN: Rect = Rect::new(100.0, 100.0, 200.0, 200.0);
  const OFF_SCREEN: Rect = Rect::new(100.0, 2000.0, 200.0, 200.0);

  fn enter(viewport: &Viewport, id: ElementId) {
    viewport.dispatch(&[IntersectionEntry::new(id, ON_SCREEN)]);
  }

  fn leave(viewport: &Viewport, id: ElementId) {
    viewport.dispatch(&[IntersectionEntry::new(id, OFF_SCREEN)]);
  }

  #[test]
  fn test_starts_hidden() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default());
    assert_eq!(reveal.state(), ViewState::Hidden);
    assert!(reveal.is_attached());
  }

  #[test]
  fn test_trigger_once_reveals_exactly_once() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default());

    enter(&viewport, 1);
    assert!(reveal.is_visible());
    assert_eq!(reveal.transitions(), 1);
    // Revealed elements are no longer observed
    assert_eq!(viewport.observer_count(), 0);

    for _ in 0..3 {
      leave(&viewport, 1);
      assert!(reveal.is_visible());
      enter(&viewport, 1);
    }
    assert!(reveal.is_visible());
    assert_eq!(reveal.transitions(), 1);
  }

  #[test]
  fn test_trigger_once_single_batch_changes_once() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default());

    viewport.dispatch(&[
      IntersectionEntry::new(1, OFF_SCREEN),
      IntersectionEntry::new(1, ON_SCREEN),
      IntersectionEntry::new(1, OFF_SCREEN),
      IntersectionEntry::new(1, ON_SCREEN),
    ]);

    assert!(reveal.is_visible());
    assert_eq!(reveal.transitions(), 1);
    assert_eq!(viewport.observer_count(), 0);
  }

  #[test]
  fn test_continuous_mode_single_batch_follows_every_entry() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default().trigger_once(false));

    viewport.dispatch(&[
      IntersectionEntry::new(1, ON_SCREEN),
      IntersectionEntry::new(1, OFF_SCREEN),
      IntersectionEntry::new(1, ON_SCREEN),
    ]);

    assert!(reveal.is_visible());
    assert_eq!(reveal.transitions(), 3);
  }

  #[test]
  fn test_continuous_mode_hides_again() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(7), RevealOptions::default().trigger_once(false));

    enter(&viewport, 7);
    assert!(reveal.is_visible());
    leave(&viewport, 7);
    assert_eq!(reveal.state(), ViewState::Hidden);
    enter(&viewport, 7);
    assert!(reveal.is_visible());
    assert_eq!(viewport.observer_count(), 1);
  }

  #[test]
  fn test_threshold_must_be_reached() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default().threshold(0.5));

    // 25% of the element is inside the root
    viewport.dispatch(&[IntersectionEntry::new(1, Rect::new(0.0, 750.0, 100.0, 200.0))]);
    assert!(!reveal.is_visible());

    // 50%
    viewport.dispatch(&[IntersectionEntry::new(1, Rect::new(0.0, 700.0, 100.0, 200.0))]);
    assert!(reveal.is_visible());
  }

  #[test]
  fn test_zero_threshold_counts_touching_edge() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default().threshold(0.0));

    viewport.dispatch(&[IntersectionEntry::new(1, Rect::new(0.0, 800.0, 100.0, 100.0))]);
    assert!(reveal.is_visible());
  }

  #[test]
  fn test_negative_root_margin_delays_reveal() {
    let viewport = Viewport::new(ROOT);
    let margin: RootMargin = "0px 0px -100px 0px".parse().unwrap();
    let reveal = viewport.observe(
      Some(1),
      RevealOptions::default().threshold(0.0).root_margin(margin),
    );

    // Inside the window, but within the bottom 100px
    viewport.dispatch(&[IntersectionEntry::new(1, Rect::new(0.0, 720.0, 100.0, 50.0))]);
    assert!(!reveal.is_visible());

    viewport.dispatch(&[IntersectionEntry::new(1, Rect::new(0.0, 650.0, 100.0, 50.0))]);
    assert!(reveal.is_visible());
  }

  #[test]
  fn test_positive_root_margin_reveals_early() {
    let viewport = Viewport::new(ROOT);
    let margin: RootMargin = "0px 0px 200px 0px".parse().unwrap();
    let reveal = viewport.observe(Some(1), RevealOptions::default().root_margin(margin));

    viewport.dispatch(&[IntersectionEntry::new(1, Rect::new(0.0, 850.0, 100.0, 100.0))]);
    assert!(reveal.is_visible());
  }

  #[test]
  fn test_missing_element_is_noop() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(None, RevealOptions::default());

    enter(&viewport, 1);
    assert!(!reveal.is_attached());
    assert_eq!(reveal.state(), ViewState::Hidden);
    assert_eq!(viewport.observer_count(), 0);
  }

  #[test]
  fn test_entries_only_affect_their_target() {
    let viewport = Viewport::new(ROOT);
    let a = viewport.observe(Some(1), RevealOptions::default());
    let b = viewport.observe(Some(2), RevealOptions::default());

    enter(&viewport, 2);
    assert!(!a.is_visible());
    assert!(b.is_visible());
  }

  #[test]
  fn test_drop_disconnects() {
    let viewport = Viewport::new(ROOT);
    let reveal = viewport.observe(Some(1), RevealOptions::default().trigger_once(false));
    let other = viewport.observe(Some(2), RevealOptions::default());
    assert_eq!(viewport.observer_count(), 2);

    drop(reveal);
    assert_eq!(viewport.observer_count(), 1);
    drop(other);
    assert_eq!(viewport.observer_count(), 0);
  }

  #[test]
  fn test_resized_root_is_used() {
    let viewport = Viewport::new(Rect::new(0.0, 0.0, 400.0, 300.0));
    let reveal = viewport.observe(Some(1), RevealOptions::default());

    enter(&viewport, 1);
    assert!(reveal.is_visible());

    let small = viewport.observe(Some(2), RevealOptions::default().trigger_once(false));
    viewport.set_root(Rect::new(0.0, 0.0, 50.0, 50.0));
    viewport.dispatch(&[IntersectionEntry::new(2, ON_SCREEN)]);
    assert!(!small.is_visible());
  }

  #[test]
  fn test_threshold_is_clamped() {
    let options = RevealOptions::default().threshold(3.0);
    assert_eq!(options.threshold, 1.0);
  }

  #[tokio::test]
  async fn test_visible_resolves_after_dispatch() {
    let viewport = Viewport::new(ROOT);
    let mut reveal = viewport.observe(Some(1), RevealOptions::default());

    let host = viewport.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      enter(&host, 1);
    });

    tokio::time::timeout(Duration::from_secs(1), reveal.visible())
      .await
      .unwrap();
    assert!(reveal.is_visible());
  }
}
