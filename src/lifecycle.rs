//! Page lifecycle: events, disposers, and the cleanup registry
//!
//! Components subscribe to `LifecycleEvent::Navigation` to (re)initialize
//! themselves for each page and register a `Disposer` for whatever they set
//! up. The router drains the registry at the start of every navigation and
//! the stacked manager drains it on teardown. Disposers run in registration
//! order.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::slug::Slug;

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Emitted before the previous page is torn down
    PreNavigation,
    /// Emitted once a route change has completed
    Navigation { slug: Slug },
}

impl LifecycleEvent {
    /// DOM event name the browser host dispatches
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::PreNavigation => "prenav",
            LifecycleEvent::Navigation { .. } => "nav",
        }
    }
}

// =============================================================================
// Disposer
// =============================================================================

/// A scoped teardown action. Runs when disposed or dropped; `forget`
/// releases it without running.
#[must_use = "dropping a Disposer runs it immediately"]
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Disposer(Some(Box::new(f)))
    }

    pub fn noop() -> Self {
        Disposer(None)
    }

    pub fn dispose(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    /// Keep the registration alive for the rest of the session.
    pub fn forget(mut self) {
        self.0 = None;
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Disposer").field(&self.0.is_some()).finish()
    }
}

// =============================================================================
// EventBus
// =============================================================================

type Listener = Rc<dyn Fn(&LifecycleEvent)>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Single-threaded fan-out of lifecycle events
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the returned disposer unsubscribes it.
    pub fn subscribe(&self, listener: impl Fn(&LifecycleEvent) + 'static) -> Disposer {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.listeners.push((id, Rc::new(listener)));
            id
        };

        let weak: Weak<RefCell<BusInner>> = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|(other, _)| *other != id);
            }
        })
    }

    /// Deliver `event` to a snapshot of the current listeners, so listeners
    /// may subscribe or unsubscribe while handling it.
    pub fn emit(&self, event: &LifecycleEvent) {
        let snapshot: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        tracing::debug!(event = event.name(), listeners = snapshot.len(), "lifecycle event");
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn notify_nav(&self, slug: Slug) {
        self.emit(&LifecycleEvent::Navigation { slug });
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

// =============================================================================
// CleanupRegistry
// =============================================================================

/// Page-lifetime list of disposers, drained once per transition
#[derive(Clone, Default)]
pub struct CleanupRegistry {
    entries: Rc<RefCell<Vec<Disposer>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, disposer: Disposer) {
        self.entries.borrow_mut().push(disposer);
    }

    pub fn add_fn(&self, f: impl FnOnce() + 'static) {
        self.add(Disposer::new(f));
    }

    /// Run and clear every registered disposer. Disposers registered while
    /// draining belong to the next page. Returns how many ran.
    pub fn drain(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        let count = entries.len();
        for disposer in entries {
            disposer.dispose();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
