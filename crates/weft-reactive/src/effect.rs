#![forbid(unsafe_code)]

//! Effects: tracked computations.
//!
//! An [`Effect`] owns a body closure. Running it pushes it as the current
//! computation, so every tracked read the body performs subscribes the effect
//! to `(target, key)`. The subscription set is dropped before every run and
//! rebuilt by the body, so an effect only depends on what its latest run
//! actually read.
//!
//! # Invariants
//!
//! 1. An effect body is never re-entered: a run requested while the body is
//!    already executing (further down the call stack) is skipped.
//! 2. After a run, the effect's dependency list mirrors exactly the store
//!    entries it is subscribed to.
//! 3. A stopped effect holds no subscriptions and runs its body untracked.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::runtime::RuntimeInner;
use crate::scheduler::{JobId, Scheduler};
use crate::store::TrackKey;
use crate::value::ObjectId;

static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    pub(crate) fn next() -> Self {
        Self(NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Options for [`Runtime::effect_with`](crate::Runtime::effect_with).
#[derive(Debug, Clone, Default)]
pub struct EffectOptions {
    /// Do not run the body at creation.
    pub lazy: bool,
    /// How notifications re-run the effect.
    pub scheduler: Scheduler,
}

impl EffectOptions {
    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    #[must_use]
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }
}

pub(crate) struct EffectInner {
    id: EffectId,
    body: RefCell<Box<dyn FnMut()>>,
    pub(crate) deps: RefCell<Vec<(ObjectId, TrackKey)>>,
    scheduler: Scheduler,
    runtime: Weak<RuntimeInner>,
    stopped: Cell<bool>,
    runs: Cell<u64>,
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        let Some(rt) = self.runtime.upgrade() else {
            return;
        };
        let deps = std::mem::take(self.deps.get_mut());
        if let Ok(mut store) = rt.store.try_borrow_mut() {
            for (target, key) in &deps {
                store.unsubscribe(*target, key, self.id);
            }
        }
        if let Ok(mut effects) = rt.effects.try_borrow_mut() {
            effects.remove(&self.id);
        }
    }
}

/// Handle to a tracked computation.
///
/// Cloning yields another handle to the **same** effect. Dropping the last
/// handle unsubscribes the effect; effects created through the runtime's
/// `effect` constructors are retained by the runtime until
/// [`stop`](Self::stop)ped or the runtime is disposed.
#[derive(Clone)]
pub struct Effect {
    pub(crate) inner: Rc<EffectInner>,
}

impl Effect {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, body: Box<dyn FnMut()>, scheduler: Scheduler) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: EffectId::next(),
                body: RefCell::new(body),
                deps: RefCell::new(Vec::new()),
                scheduler,
                runtime,
                stopped: Cell::new(false),
                runs: Cell::new(0),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<EffectInner> {
        Rc::downgrade(&self.inner)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Run the body now, tracking its reads.
    ///
    /// Previous subscriptions are dropped first. If the body is already
    /// running further down the stack the call is a no-op.
    pub fn run(&self) {
        let Ok(mut body) = self.inner.body.try_borrow_mut() else {
            trace!(effect = self.id().raw(), "skipping re-entrant effect run");
            return;
        };
        self.inner.runs.set(self.inner.runs.get() + 1);

        match self.inner.runtime.upgrade() {
            Some(rt) if !self.inner.stopped.get() && !rt.disposed.get() => {
                rt.cleanup(self);
                let _frame = rt.enter(self.clone());
                (&mut *body)();
            }
            _ => (&mut *body)(),
        }
    }

    /// Re-run according to this effect's scheduler.
    pub fn schedule(&self) {
        match &self.inner.scheduler {
            Scheduler::Immediate => self.run(),
            Scheduler::Queued(f) => f(self),
        }
    }

    /// Detach: drop all subscriptions, release the runtime's retention and
    /// cancel any pending job. Later runs execute the body untracked.
    pub fn stop(&self) {
        if self.inner.stopped.replace(true) {
            return;
        }
        if let Some(rt) = self.inner.runtime.upgrade() {
            rt.cleanup(self);
            rt.effects.borrow_mut().remove(&self.id());
            rt.jobs.borrow_mut().cancel(JobId::Effect(self.id()));
            let released = rt.retained.borrow_mut().remove(&self.id());
            drop(released);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.inner.stopped.get()
    }

    /// How many times the body has run.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Number of store entries this effect is subscribed to.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id().raw())
            .field("active", &self.is_active())
            .field("runs", &self.run_count())
            .field("deps", &self.dependency_count())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}
