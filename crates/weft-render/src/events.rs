#![forbid(unsafe_code)]

//! Event listener bookkeeping for hosts.
//!
//! A host attaches one listener per (element, event name) and routes it
//! through an [`EventInvoker`]. Re-patching the same event swaps the
//! handler list inside the invoker; the underlying listener stays attached.
//!
//! # Invariants
//!
//! 1. An event stamped before the invoker was attached is ignored.
//! 2. Handlers of one invoker run in the order they were supplied.
//! 3. A swap never changes the attach instant.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;
use web_time::Instant;
use weft_core::Clock;

use crate::vnode::{NodeId, PropValue};

/// A dispatched host event.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: Rc<str>,
    pub timestamp: Instant,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<Rc<str>>, timestamp: Instant) -> Self {
        Self {
            name: name.into(),
            timestamp,
        }
    }
}

pub type Handler = Rc<dyn Fn(&Event)>;

/// Ordered handler list carried by an event prop.
///
/// Equality is identity: two lists are equal when they hold the same
/// closures in the same order.
#[derive(Clone, Default)]
pub struct Handlers(SmallVec<[Handler; 1]>);

impl Handlers {
    #[must_use]
    pub fn single(f: impl Fn(&Event) + 'static) -> Self {
        let handler: Handler = Rc::new(f);
        Self(smallvec::smallvec![handler])
    }

    pub fn push(&mut self, handler: Handler) {
        self.0.push(handler);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.0.iter()
    }
}

impl PartialEq for Handlers {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handlers({})", self.0.len())
    }
}

impl From<Handler> for Handlers {
    fn from(handler: Handler) -> Self {
        Self(smallvec::smallvec![handler])
    }
}

impl FromIterator<Handler> for Handlers {
    fn from_iter<I: IntoIterator<Item = Handler>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The single listener a host keeps per (element, event name).
pub struct EventInvoker {
    handlers: Handlers,
    attached: Instant,
}

impl EventInvoker {
    /// Attach `handlers`, stamping the attach instant from `clock`.
    #[must_use]
    pub fn attach(handlers: Handlers, clock: &Clock) -> Self {
        Self {
            handlers,
            attached: clock.now(),
        }
    }

    /// Replace the handler list without re-attaching.
    pub fn swap(&mut self, handlers: Handlers) {
        self.handlers = handlers;
    }

    #[must_use]
    pub fn attached_at(&self) -> Instant {
        self.attached
    }

    #[must_use]
    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// Run every handler for `event`. Returns `false` when the event
    /// predates the attachment and was dropped.
    pub fn invoke(&self, event: &Event) -> bool {
        if event.timestamp < self.attached {
            tracing::trace!(event = %event.name, "event predates listener, ignored");
            return false;
        }
        for handler in self.handlers.iter() {
            handler(event);
        }
        true
    }
}

impl fmt::Debug for EventInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInvoker")
            .field("handlers", &self.handlers)
            .field("attached", &self.attached)
            .finish()
    }
}

/// `onClick` → `click`. Returns `None` for props that are not listeners.
#[must_use]
pub fn event_name(prop: &str) -> Option<String> {
    let rest = prop.strip_prefix("on")?;
    let first = rest.chars().next()?;
    first
        .is_ascii_uppercase()
        .then(|| rest.to_ascii_lowercase())
}

/// What a listener prop patch did to the host listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerChange {
    Attached,
    Swapped,
    Detached,
    Unchanged,
}

/// Invokers for every listener a host has attached.
#[derive(Debug, Default)]
pub struct ListenerTable {
    clock: Clock,
    invokers: AHashMap<(NodeId, Rc<str>), EventInvoker>,
}

impl ListenerTable {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            invokers: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Apply a listener prop. A handler value attaches or swaps; anything
    /// else (including absence) detaches.
    pub fn patch(&mut self, el: NodeId, event: &str, next: Option<&PropValue>) -> ListenerChange {
        let key = (el, Rc::<str>::from(event));
        match next {
            Some(PropValue::Handlers(handlers)) => match self.invokers.get_mut(&key) {
                Some(invoker) => {
                    invoker.swap(handlers.clone());
                    ListenerChange::Swapped
                }
                None => {
                    self.invokers
                        .insert(key, EventInvoker::attach(handlers.clone(), &self.clock));
                    ListenerChange::Attached
                }
            },
            _ => match self.invokers.remove(&key) {
                Some(_) => ListenerChange::Detached,
                None => ListenerChange::Unchanged,
            },
        }
    }

    /// Route `event` to the invoker on `el`. Returns whether any handler ran.
    pub fn dispatch(&self, el: NodeId, event: &Event) -> bool {
        self.invokers
            .get(&(el, Rc::clone(&event.name)))
            .is_some_and(|invoker| invoker.invoke(event))
    }

    #[must_use]
    pub fn invoker(&self, el: NodeId, event: &str) -> Option<&EventInvoker> {
        self.invokers.get(&(el, Rc::<str>::from(event)))
    }

    /// Drop every listener attached to `el`.
    pub fn forget(&mut self, el: NodeId) -> usize {
        let before = self.invokers.len();
        self.invokers.retain(|(node, _), _| *node != el);
        before - self.invokers.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }
}
