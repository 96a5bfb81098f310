#![forbid(unsafe_code)]

//! Watches: run a callback when a tracked source changes.
//!
//! The source is either a getter closure or a whole wrapper. A wrapper
//! source is traversed depth-first (each object visited once) so that every
//! reachable property is a dependency.
//!
//! Each change runs the watch job: re-evaluate the source, run the pending
//! invalidation callback (if any), call `callback(new, old, on_invalidate)`
//! and remember `new` as the next `old`. With [`Flush::Post`] the job is
//! queued on the runtime instead and runs at the next flush; repeated changes
//! before that flush coalesce into one job.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashSet;
use tracing::{trace, warn};

use crate::effect::Effect;
use crate::proxy::{Observed, Reactive};
use crate::runtime::Runtime;
use crate::scheduler::{JobId, Scheduler};
use crate::value::{ObjectId, ObjectKind, Value};

/// When the watch job runs relative to the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    /// Inline, inside the notifying write.
    #[default]
    Sync,
    /// Queued; runs at the next [`Runtime::flush`] (or end of batch).
    Post,
}

/// Options for [`Runtime::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchOptions {
    /// Run the callback once at setup, with no old value.
    pub immediate: bool,
    pub flush: Flush,
}

impl WatchOptions {
    #[must_use]
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    #[must_use]
    pub fn flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
        self
    }
}

/// Registration slot for an invalidation callback, passed to every watch
/// callback.
///
/// A registered callback runs once: right before the next callback
/// invocation, or when the watch is stopped.
#[derive(Default)]
pub struct OnInvalidate {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl OnInvalidate {
    /// Register `f`, replacing any callback registered earlier in the same
    /// invocation.
    pub fn register(&mut self, f: impl FnOnce() + 'static) {
        self.cleanup = Some(Box::new(f));
    }
}

impl fmt::Debug for OnInvalidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnInvalidate")
            .field("registered", &self.cleanup.is_some())
            .finish()
    }
}

type Callback<T> = Box<dyn FnMut(&T, Option<&T>, &mut OnInvalidate)>;
type CleanupSlot = Rc<RefCell<Option<Box<dyn FnOnce()>>>>;

struct WatchState<T> {
    latest: Rc<RefCell<Option<T>>>,
    old: RefCell<Option<T>>,
    cleanup: CleanupSlot,
    callback: RefCell<Callback<T>>,
    max_reruns: u32,
}

impl<T> WatchState<T> {
    /// Re-evaluate the source and call the callback. A change made while the
    /// callback is running leaves its value in `latest`; the running
    /// invocation calls the callback again with it once it returns.
    fn run_job(&self, effect: &Effect) {
        effect.run();
        let Ok(mut callback) = self.callback.try_borrow_mut() else {
            trace!(effect = effect.id().raw(), "deferring re-entrant watch change");
            return;
        };
        let mut calls = 0u32;
        loop {
            let next = self.latest.borrow_mut().take();
            let Some(new) = next else {
                break;
            };
            if calls > self.max_reruns {
                warn!(
                    effect = effect.id().raw(),
                    calls, "watch callback keeps changing its source; dropping change"
                );
                break;
            }
            calls += 1;
            let pending = self.cleanup.borrow_mut().take();
            if let Some(cleanup) = pending {
                cleanup();
            }
            let old = self.old.borrow_mut().take();
            let mut on_invalidate = OnInvalidate::default();
            (&mut *callback)(&new, old.as_ref(), &mut on_invalidate);
            if let Some(cleanup) = on_invalidate.cleanup {
                *self.cleanup.borrow_mut() = Some(cleanup);
            }
            *self.old.borrow_mut() = Some(new);
        }
    }
}

/// Handle to a running watch.
///
/// Dropping the handle does not stop the watch; call [`stop`](Self::stop).
pub struct WatchHandle {
    effect: Effect,
    cleanup: CleanupSlot,
}

impl WatchHandle {
    /// Detach the watch and run a pending invalidation callback.
    pub fn stop(&self) {
        self.effect.stop();
        let pending = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = pending {
            cleanup();
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }

    /// The effect evaluating the source.
    #[must_use]
    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("effect", &self.effect)
            .finish()
    }
}

/// Read every property reachable from `value`, visiting each object once.
pub fn traverse(value: &Observed, seen: &mut AHashSet<ObjectId>) {
    match value {
        Observed::Reactive(target) => {
            if !seen.insert(target.id()) {
                return;
            }
            match target.kind() {
                ObjectKind::Record | ObjectKind::Sequence => {
                    for key in target.own_keys() {
                        traverse(&target.get(key), seen);
                    }
                }
                ObjectKind::Set | ObjectKind::Map => {
                    target.for_each(|value, key| {
                        traverse(&key, seen);
                        traverse(&value, seen);
                    });
                }
            }
        }
        Observed::Value(Value::Ref(r)) => traverse(&r.get(), seen),
        Observed::Value(_) => {}
    }
}

impl Runtime {
    /// Watch the value produced by `getter`.
    pub fn watch<T: 'static>(
        &self,
        getter: impl Fn() -> T + 'static,
        callback: impl FnMut(&T, Option<&T>, &mut OnInvalidate) + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let latest: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let cleanup: CleanupSlot = Rc::new(RefCell::new(None));
        let state = Rc::new(WatchState {
            latest: Rc::clone(&latest),
            old: RefCell::new(None),
            cleanup: Rc::clone(&cleanup),
            callback: RefCell::new(Box::new(callback)),
            max_reruns: self.inner.config.max_notify_depth,
        });

        let body = Box::new(move || {
            let value = getter();
            *latest.borrow_mut() = Some(value);
        });

        let job_state = Rc::clone(&state);
        let scheduler = match options.flush {
            Flush::Sync => Scheduler::queued(move |effect| job_state.run_job(effect)),
            Flush::Post => {
                let runtime = Rc::downgrade(&self.inner);
                Scheduler::queued(move |effect| {
                    let Some(rt) = runtime.upgrade() else {
                        return;
                    };
                    let (state, effect) = (Rc::clone(&job_state), effect.clone());
                    let id = JobId::Effect(effect.id());
                    rt.queue_job(id, Box::new(move || state.run_job(&effect)));
                })
            }
        };

        let effect = self.inner.create_effect(body, scheduler);
        self.inner.retain(&effect);

        if options.immediate {
            state.run_job(&effect);
        } else {
            effect.run();
            let first = state.latest.borrow_mut().take();
            *state.old.borrow_mut() = first;
        }

        WatchHandle { effect, cleanup }
    }

    /// Watch every property reachable from `source`. The callback receives
    /// the source itself as both new and old value.
    pub fn watch_reactive(
        &self,
        source: &Reactive,
        callback: impl FnMut(&Observed, Option<&Observed>, &mut OnInvalidate) + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let source = Observed::Reactive(source.clone());
        self.watch(
            move || {
                traverse(&source, &mut AHashSet::new());
                source.clone()
            },
            callback,
            options,
        )
    }
}
