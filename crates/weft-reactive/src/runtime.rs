#![forbid(unsafe_code)]

//! The reactive runtime: tracking context, dependency store, wrapper cache
//! and job queue for one reactive world.
//!
//! A [`Runtime`] is a cheap, clonable handle. Wrappers and effects created
//! from it hold only weak references back, so dropping every `Runtime`
//! handle (or calling [`Runtime::dispose`]) tears the world down and leaves
//! the survivors as untracked views over their raw data.
//!
//! # Notification rules
//!
//! A write to `(target, key)` re-runs:
//!
//! 1. subscribers of `(target, key)`;
//! 2. on `Add`/`Delete`, or `Set` on a map, subscribers of `Iterate`;
//! 3. on `Add`/`Delete` on a map, subscribers of `MapKeyIterate`;
//! 4. on `Add` on a sequence, subscribers of `Length`;
//! 5. on a `Length` write to a sequence, subscribers of every index at or
//!    past the new length;
//! 6. on `Clear`, every subscriber of the target.
//!
//! The effect that performed the write is never among them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, error, warn};
use weft_core::RuntimeConfig;

use crate::effect::{Effect, EffectId, EffectInner, EffectOptions};
use crate::error::{ReactiveError, Result};
use crate::proxy::{AsRawObject, Reactive, WrapMode};
use crate::scheduler::{BatchScope, Job, JobId, JobQueue, Scheduler, TrackingPause};
use crate::store::{ChangeKind, DependencyStore, TargetKind, TrackKey};
use crate::value::{ObjectId, ObjectRef};

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) store: RefCell<DependencyStore>,
    stack: RefCell<Vec<Effect>>,
    pub(crate) should_track: Cell<bool>,
    pub(crate) effects: RefCell<AHashMap<EffectId, Weak<EffectInner>>>,
    pub(crate) retained: RefCell<AHashMap<EffectId, Effect>>,
    wrappers: RefCell<AHashMap<(ObjectId, WrapMode), Reactive>>,
    pub(crate) jobs: RefCell<JobQueue>,
    flushing: Cell<bool>,
    pub(crate) batch_depth: Cell<u32>,
    notify_depth: Cell<u32>,
    readonly_violations: Cell<u64>,
    notifications: Cell<u64>,
    pub(crate) disposed: Cell<bool>,
}

/// Restores a flag or counter when a scope ends, even on unwind.
struct Restore<'a, T: Copy> {
    cell: &'a Cell<T>,
    previous: T,
}

impl<T: Copy> Drop for Restore<'_, T> {
    fn drop(&mut self) {
        self.cell.set(self.previous);
    }
}

/// An effect's slot on the tracking stack.
pub(crate) struct EffectFrame<'a> {
    runtime: &'a RuntimeInner,
    previous: bool,
}

impl Drop for EffectFrame<'_> {
    fn drop(&mut self) {
        let popped = self.runtime.stack.borrow_mut().pop();
        self.runtime.should_track.set(self.previous);
        drop(popped);
    }
}

impl RuntimeInner {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            store: RefCell::new(DependencyStore::new()),
            stack: RefCell::new(Vec::new()),
            should_track: Cell::new(true),
            effects: RefCell::new(AHashMap::new()),
            retained: RefCell::new(AHashMap::new()),
            wrappers: RefCell::new(AHashMap::new()),
            jobs: RefCell::new(JobQueue::default()),
            flushing: Cell::new(false),
            batch_depth: Cell::new(0),
            notify_depth: Cell::new(0),
            readonly_violations: Cell::new(0),
            notifications: Cell::new(0),
            disposed: Cell::new(false),
        }
    }

    // ── Tracking ────────────────────────────────────────────────────────

    /// Push `effect` as the current computation and enable tracking.
    pub(crate) fn enter(&self, effect: Effect) -> EffectFrame<'_> {
        self.stack.borrow_mut().push(effect);
        let previous = self.should_track.replace(true);
        EffectFrame {
            runtime: self,
            previous,
        }
    }

    /// Drop every subscription `effect` holds.
    pub(crate) fn cleanup(&self, effect: &Effect) {
        let deps = std::mem::take(&mut *effect.inner.deps.borrow_mut());
        if deps.is_empty() {
            return;
        }
        let mut store = self.store.borrow_mut();
        for (target, key) in &deps {
            store.unsubscribe(*target, key, effect.id());
        }
    }

    /// Subscribe the current computation to `(target, key)`.
    pub(crate) fn track(&self, target: ObjectId, key: TrackKey) {
        if !self.should_track.get() || self.disposed.get() {
            return;
        }
        let stack = self.stack.borrow();
        let Some(effect) = stack.last() else {
            return;
        };
        if !effect.is_active() {
            return;
        }
        if self
            .store
            .borrow_mut()
            .subscribe(target, key.clone(), effect.id())
        {
            effect.inner.deps.borrow_mut().push((target, key));
        }
    }

    pub(crate) fn active_effect(&self) -> Option<Effect> {
        self.stack.borrow().last().cloned()
    }

    /// Resolve and schedule everything a write to `(target, key)` affects.
    pub(crate) fn notify(
        &self,
        target: ObjectId,
        kind: TargetKind,
        key: TrackKey,
        change: ChangeKind,
        new_len: Option<usize>,
    ) {
        if self.disposed.get() {
            return;
        }
        self.notifications.set(self.notifications.get() + 1);

        let mut ids: IndexSet<EffectId> = IndexSet::new();
        {
            let store = self.store.borrow();
            if change == ChangeKind::Clear {
                for (_, subs) in store.entries(target) {
                    ids.extend(subs.iter().copied());
                }
            } else {
                ids.extend(store.subscribers(target, &key));
                if change.is_structural() || (change == ChangeKind::Set && kind == TargetKind::Map) {
                    ids.extend(store.subscribers(target, &TrackKey::Iterate));
                }
                if change.is_structural() && kind == TargetKind::Map {
                    ids.extend(store.subscribers(target, &TrackKey::MapKeyIterate));
                }
                if change == ChangeKind::Add && kind == TargetKind::Sequence {
                    ids.extend(store.subscribers(target, &TrackKey::Length));
                }
                if let (TargetKind::Sequence, TrackKey::Length, Some(len)) = (kind, &key, new_len) {
                    for (k, subs) in store.entries(target) {
                        if matches!(k, TrackKey::Index(i) if *i >= len) {
                            ids.extend(subs.iter().copied());
                        }
                    }
                }
            }
        }
        if let Some(running) = self.stack.borrow().last() {
            ids.shift_remove(&running.id());
        }
        if ids.is_empty() {
            return;
        }

        let effects: SmallVec<[Effect; 4]> = {
            let registry = self.effects.borrow();
            ids.iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .map(|inner| Effect { inner })
                .collect()
        };

        let depth = self.notify_depth.get();
        if depth >= self.config.max_notify_depth {
            error!(
                target_id = target.raw(),
                key = %key,
                depth,
                dropped = effects.len(),
                "notification depth limit reached; dropping notification"
            );
            return;
        }
        self.notify_depth.set(depth + 1);
        let _restore = Restore {
            cell: &self.notify_depth,
            previous: depth,
        };
        for effect in &effects {
            effect.schedule();
        }
    }

    // ── Effects ─────────────────────────────────────────────────────────

    pub(crate) fn create_effect(
        self: &Rc<Self>,
        body: Box<dyn FnMut()>,
        scheduler: Scheduler,
    ) -> Effect {
        let effect = Effect::new(Rc::downgrade(self), body, scheduler);
        self.register(&effect);
        effect
    }

    pub(crate) fn register(&self, effect: &Effect) {
        self.effects
            .borrow_mut()
            .insert(effect.id(), effect.downgrade());
    }

    pub(crate) fn retain(&self, effect: &Effect) {
        if !self.disposed.get() {
            self.retained
                .borrow_mut()
                .insert(effect.id(), effect.clone());
        }
    }

    // ── Wrappers ────────────────────────────────────────────────────────

    /// The cached wrapper for `(raw, mode)`, created on first request.
    pub(crate) fn wrap(self: &Rc<Self>, raw: &ObjectRef, mode: WrapMode) -> Reactive {
        let key = (raw.id(), mode);
        if let Some(existing) = self.wrappers.borrow().get(&key) {
            return existing.clone();
        }
        let wrapper = Reactive::new(raw.clone(), mode, Rc::downgrade(self));
        if !self.disposed.get() {
            self.wrappers.borrow_mut().insert(key, wrapper.clone());
        }
        wrapper
    }

    pub(crate) fn record_readonly_violation(&self) {
        self.readonly_violations
            .set(self.readonly_violations.get() + 1);
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    pub(crate) fn queue_job(&self, id: JobId, job: Job) -> bool {
        if self.disposed.get() {
            return false;
        }
        self.jobs.borrow_mut().push(id, job)
    }

    /// Drain the job queue, repeating while jobs enqueue more jobs.
    pub(crate) fn flush(&self) -> Result<usize> {
        if self.flushing.get() {
            return Ok(0);
        }
        self.flushing.set(true);
        let _restore = Restore {
            cell: &self.flushing,
            previous: false,
        };

        let mut ran = 0;
        let mut passes = 0u32;
        loop {
            let batch = self.jobs.borrow_mut().take();
            if batch.is_empty() {
                return Ok(ran);
            }
            if passes >= self.config.max_flush_passes {
                let dropped = batch.len();
                drop(batch);
                warn!(passes, dropped, "job queue did not settle");
                return Err(ReactiveError::FlushLimitExceeded { passes, dropped });
            }
            passes += 1;
            debug!(pass = passes, jobs = batch.len(), "flushing job queue");
            for (_, job) in batch {
                job();
                ran += 1;
            }
        }
    }
}

/// Counters describing a runtime's current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Targets with at least one store entry.
    pub targets: usize,
    /// `(target, key)` entries, including emptied ones.
    pub entries: usize,
    /// Live subscriptions across all entries.
    pub subscriptions: usize,
    /// Effects alive and registered with the runtime.
    pub effects: usize,
    /// Effects kept alive by the runtime itself.
    pub retained: usize,
    /// Cached wrappers.
    pub wrappers: usize,
    /// Jobs waiting for the next flush.
    pub pending_jobs: usize,
    /// Writes rejected by read-only wrappers.
    pub readonly_violations: u64,
    /// Writes that reached the notification step.
    pub notifications: u64,
}

/// Handle to a reactive world.
///
/// Cloning yields another handle to the **same** runtime.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use weft_reactive::{ObjectRef, Runtime};
///
/// let rt = Runtime::new();
/// let state = rt.reactive(&ObjectRef::record([("count", 0)]));
/// let seen = Rc::new(Cell::new(0.0));
///
/// let (s, out) = (state.clone(), Rc::clone(&seen));
/// rt.effect(move || out.set(s.get("count").as_f64().unwrap_or_default()));
///
/// state.set("count", 3);
/// assert_eq!(seen.get(), 3.0);
/// ```
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(config)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // ── Wrapping ────────────────────────────────────────────────────────

    /// Deep, mutable wrapper. Wrapping a wrapper wraps its raw source.
    pub fn reactive(&self, source: &impl AsRawObject) -> Reactive {
        self.wrap(source, WrapMode::DEEP)
    }

    /// Mutable wrapper whose reads return nested objects unwrapped.
    pub fn shallow_reactive(&self, source: &impl AsRawObject) -> Reactive {
        self.wrap(source, WrapMode::SHALLOW)
    }

    /// Deep read-only wrapper. Reads are not tracked; writes are rejected.
    pub fn readonly(&self, source: &impl AsRawObject) -> Reactive {
        self.wrap(source, WrapMode::READONLY)
    }

    pub fn shallow_readonly(&self, source: &impl AsRawObject) -> Reactive {
        self.wrap(source, WrapMode::SHALLOW_READONLY)
    }

    /// The cached wrapper of `source` in `mode`.
    pub fn wrap(&self, source: &impl AsRawObject, mode: WrapMode) -> Reactive {
        self.inner.wrap(source.as_raw_object(), mode)
    }

    // ── Effects ─────────────────────────────────────────────────────────

    /// Create an effect and run it immediately. The runtime keeps it alive
    /// until it is stopped.
    pub fn effect(&self, body: impl FnMut() + 'static) -> Effect {
        self.effect_with(body, EffectOptions::default())
    }

    pub fn effect_with(&self, body: impl FnMut() + 'static, options: EffectOptions) -> Effect {
        let effect = self.inner.create_effect(Box::new(body), options.scheduler);
        self.inner.retain(&effect);
        if !options.lazy {
            effect.run();
        }
        effect
    }

    /// The computation currently running, if any.
    #[must_use]
    pub fn active_effect(&self) -> Option<Effect> {
        self.inner.active_effect()
    }

    // ── Tracking control ────────────────────────────────────────────────

    /// Run `f` without recording dependencies.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pause = self.pause_tracking();
        f()
    }

    /// Suppress tracking until the guard drops.
    pub fn pause_tracking(&self) -> TrackingPause {
        TrackingPause::new(Rc::clone(&self.inner))
    }

    // ── Jobs and batching ───────────────────────────────────────────────

    /// Queue `job` for the next flush. Returns `false` if a job with the
    /// same id is already pending (the new one is dropped).
    pub fn queue_job(&self, id: u64, job: impl FnOnce() + 'static) -> bool {
        self.inner.queue_job(JobId::Custom(id), Box::new(job))
    }

    /// A scheduler that defers an effect's re-runs to the next flush. Runs
    /// requested before the flush coalesce into one.
    #[must_use]
    pub fn deferred_scheduler(&self) -> Scheduler {
        let runtime = Rc::downgrade(&self.inner);
        Scheduler::queued(move |effect| {
            let Some(rt) = runtime.upgrade() else {
                return;
            };
            let effect = effect.clone();
            rt.queue_job(JobId::Effect(effect.id()), Box::new(move || effect.run()));
        })
    }

    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.borrow().len()
    }

    /// Run every pending job, including jobs queued by those jobs.
    /// Returns the number of jobs run. A nested call returns `Ok(0)`.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::FlushLimitExceeded`] when jobs keep enqueueing jobs
    /// past `max_flush_passes`; the unfinished pass is dropped.
    pub fn flush(&self) -> Result<usize> {
        self.inner.flush()
    }

    /// Open a batch. The queue flushes when the outermost scope ends.
    pub fn batch_scope(&self) -> BatchScope {
        BatchScope::new(Rc::clone(&self.inner))
    }

    /// Run `f` as a batch and flush afterwards (unless nested).
    ///
    /// # Errors
    ///
    /// Propagates the flush error of the outermost batch.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let scope = self.batch_scope();
        let out = f();
        scope.finish()?;
        Ok(out)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    #[must_use]
    pub fn stats(&self) -> RuntimeStats {
        let inner = &self.inner;
        let store = inner.store.borrow();
        RuntimeStats {
            targets: store.target_count(),
            entries: store.entry_count(),
            subscriptions: store.subscription_count(),
            effects: inner.effects.borrow().len(),
            retained: inner.retained.borrow().len(),
            wrappers: inner.wrappers.borrow().len(),
            pending_jobs: inner.jobs.borrow().len(),
            readonly_violations: inner.readonly_violations.get(),
            notifications: inner.notifications.get(),
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Tear down the store, wrapper cache, retained effects and pending
    /// jobs. Surviving wrappers keep working as untracked views; surviving
    /// effects run untracked when called.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let retained = std::mem::take(&mut *self.inner.retained.borrow_mut());
        let wrappers = std::mem::take(&mut *self.inner.wrappers.borrow_mut());
        // Detached first: dropping a job may drop handles that reach back
        // into the queue.
        let mut jobs = std::mem::take(&mut *self.inner.jobs.borrow_mut());
        debug!(
            retained = retained.len(),
            wrappers = wrappers.len(),
            jobs = jobs.len(),
            "disposing runtime"
        );
        jobs.clear();
        drop(retained);
        drop(wrappers);
        self.inner.store.borrow_mut().clear();
        self.inner.effects.borrow_mut().clear();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let c = Rc::new(Cell::new(0));
        (Rc::clone(&c), c)
    }

    #[test]
    fn reads_outside_effects_are_inert() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", 1)]));
        let _ = state.get("n");
        assert_eq!(rt.stats().subscriptions, 0);
    }

    #[test]
    fn writer_effect_does_not_retrigger_itself() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", 0)]));
        let s = state.clone();
        let effect = rt.effect(move || {
            let n = s.get("n").as_f64().unwrap_or_default();
            s.set("n", n + 1.0);
        });
        assert_eq!(effect.run_count(), 1);
        assert_eq!(state.get("n").as_f64(), Some(1.0));
    }

    #[test]
    fn nested_effects_restore_the_outer_one() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("outer", 0), ("inner", 0)]));
        let (outer_runs, outer_count) = counter();
        let (s, rt2) = (state.clone(), rt.clone());
        let inner_slot: Rc<RefCell<Vec<Effect>>> = Rc::default();
        let slot = Rc::clone(&inner_slot);
        rt.effect(move || {
            outer_runs.set(outer_runs.get() + 1);
            let s_inner = s.clone();
            if slot.borrow().is_empty() {
                let inner = rt2.effect(move || {
                    let _ = s_inner.get("inner");
                });
                slot.borrow_mut().push(inner);
            }
            let _ = s.get("outer");
        });
        assert_eq!(outer_count.get(), 1);

        state.set("inner", 1);
        assert_eq!(outer_count.get(), 1);
        state.set("outer", 1);
        assert_eq!(outer_count.get(), 2);
    }

    #[test]
    fn notify_depth_limit_stops_runaway_chains() {
        let rt = Runtime::with_config(RuntimeConfig::default().with_max_notify_depth(4));
        let keys = ["k0", "k1", "k2", "k3", "k4", "k5"];
        let state = rt.reactive(&ObjectRef::record(keys.map(|k| (k, 0))));
        // Effect i copies k{i} into k{i+1}.
        let effects: Vec<Effect> = (0..5)
            .map(|i| {
                let s = state.clone();
                rt.effect(move || {
                    let n = s.get(keys[i]).as_f64().unwrap_or_default();
                    s.set(keys[i + 1], n);
                })
            })
            .collect();

        state.set("k0", 7);
        let runs: Vec<u64> = effects.iter().map(Effect::run_count).collect();
        assert_eq!(runs, vec![2, 2, 2, 2, 1]);
        assert_eq!(state.get("k4").as_f64(), Some(7.0));
        assert_eq!(state.get("k5").as_f64(), Some(0.0));
    }

    #[test]
    fn flush_runs_jobs_in_order_and_coalesces() {
        let rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (id, tag) in [(1, "a"), (2, "b"), (1, "c")] {
            let log = Rc::clone(&log);
            rt.queue_job(id, move || log.borrow_mut().push(tag));
        }
        assert_eq!(rt.pending_jobs(), 2);
        assert_eq!(rt.flush().unwrap(), 2);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn flush_limit_reports_runaway_jobs() {
        fn requeue(rt: Runtime) {
            let next = rt.clone();
            rt.queue_job(9, move || requeue(next));
        }
        let rt = Runtime::with_config(RuntimeConfig::default().with_max_flush_passes(3));
        requeue(rt.clone());
        let err = rt.flush().unwrap_err();
        assert_eq!(
            err,
            ReactiveError::FlushLimitExceeded {
                passes: 3,
                dropped: 1
            }
        );
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn dispose_discards_pending_jobs() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", 0)]));
        let s = state.clone();
        let effect = rt.effect_with(
            move || {
                let _ = s.get("n");
            },
            EffectOptions::default().scheduler(rt.deferred_scheduler()),
        );
        state.set("n", 1);
        assert_eq!(rt.pending_jobs(), 1);

        rt.dispose();
        assert_eq!(rt.pending_jobs(), 0);
        assert_eq!(rt.flush(), Ok(0));
        assert_eq!(effect.run_count(), 1);

        // A disposed runtime refuses new work.
        assert!(!rt.queue_job(1, || panic!("ran after dispose")));
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn batch_flushes_on_outermost_exit() {
        let rt = Runtime::new();
        let (ran, count) = counter();
        let rt2 = rt.clone();
        rt.batch(|| {
            rt2.queue_job(1, move || ran.set(ran.get() + 1));
            let _inner = rt2.batch_scope();
            assert_eq!(rt2.pending_jobs(), 1);
        })
        .unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(rt.pending_jobs(), 0);
    }

    #[test]
    fn deferred_scheduler_coalesces_until_flush() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", 0)]));
        let s = state.clone();
        let effect = rt.effect_with(
            move || {
                let _ = s.get("n");
            },
            EffectOptions::default().scheduler(rt.deferred_scheduler()),
        );
        state.set("n", 1);
        state.set("n", 2);
        assert_eq!(effect.run_count(), 1);
        assert_eq!(rt.pending_jobs(), 1);
        assert_eq!(rt.flush(), Ok(1));
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", 0)]));
        let (s, rt2) = (state.clone(), rt.clone());
        let effect = rt.effect(move || {
            rt2.untracked(|| {
                let _ = s.get("n");
            });
        });
        assert_eq!(effect.dependency_count(), 0);
        state.set("n", 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn dispose_releases_everything() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", 0)]));
        let s = state.clone();
        let effect = rt.effect(move || {
            let _ = s.get("n");
        });
        rt.queue_job(1, || {});
        rt.dispose();

        let stats = rt.stats();
        assert_eq!(stats.subscriptions, 0);
        assert_eq!(stats.retained, 0);
        assert_eq!(stats.wrappers, 0);
        assert_eq!(stats.pending_jobs, 0);

        // Wrappers degrade to untracked access.
        assert!(state.set("n", 5));
        assert_eq!(state.get("n").into_value(), Value::from(5));
        assert_eq!(effect.run_count(), 1);
        assert!(rt.is_disposed());
    }
}
