#![forbid(unsafe_code)]

//! Lazy computed values that auto-update from tracked reads.
//!
//! # Design
//!
//! [`Computed<T>`] owns a lazy effect whose body is the getter. The effect's
//! scheduler does not recompute: it only flips the dirty flag and notifies
//! whoever read the computed value. The next call to [`get()`](Computed::get)
//! re-runs the getter (re-tracking its dependencies) and caches the result.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of all
//!    dependencies (no stale reads after a dependency mutation completes).
//! 2. The getter is called at most once per dependency change cycle
//!    (memoization), and never before the first `get()`.
//! 3. If no dependency has changed, `get()` returns the cached value.
//! 4. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Getter panics**: The cached value remains from the last successful
//!   computation. The dirty flag stays set so the next `get()` will retry.
//! - **Runtime disposed**: The computed keeps its last cached value; a dirty
//!   computed recomputes once more, untracked.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::effect::Effect;
use crate::runtime::{Runtime, RuntimeInner};
use crate::scheduler::Scheduler;
use crate::store::{ChangeKind, TargetKind, TrackKey};
use crate::value::ObjectId;

/// Shared interior for [`Computed<T>`].
struct ComputedInner<T> {
    /// Target identity of the derived value.
    id: ObjectId,
    /// Cached result (None only before first computation).
    cached: RefCell<Option<T>>,
    /// Whether the cached value is stale.
    dirty: Cell<bool>,
    /// Monotonically increasing version, bumped on each recomputation.
    version: Cell<u64>,
    /// The lazy effect running the getter. Set once at construction.
    effect: OnceCell<Effect>,
    runtime: Weak<RuntimeInner>,
}

impl<T> ComputedInner<T> {
    fn live_runtime(&self) -> Option<Rc<RuntimeInner>> {
        self.runtime.upgrade().filter(|rt| !rt.disposed.get())
    }

    /// Mark stale and tell dependents, without recomputing.
    fn mark_dirty(&self) {
        if self.dirty.replace(true) {
            return;
        }
        if let Some(rt) = self.live_runtime() {
            rt.notify(
                self.id,
                TargetKind::Derived,
                TrackKey::DerivedValue,
                ChangeKind::Set,
                None,
            );
        }
    }

    fn refresh(&self) {
        if !self.dirty.get() && self.cached.borrow().is_some() {
            return;
        }
        let Some(effect) = self.effect.get() else {
            return;
        };
        let before = effect.run_count();
        effect.run();
        if effect.run_count() > before && self.cached.borrow().is_some() {
            self.dirty.set(false);
            self.version.set(self.version.get() + 1);
        }
    }

    fn track(&self) {
        if let Some(rt) = self.live_runtime() {
            rt.track(self.id, TrackKey::DerivedValue);
        }
    }
}

/// A lazily-evaluated, memoized value derived from tracked reads.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
///
/// # Invariants
///
/// 1. `dirty` is true after any dependency changes and before `get()`.
/// 2. `version` increments by 1 on each recomputation.
/// 3. The getter is called only when `dirty` is true and `get()` is called.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &self.inner.cached.try_borrow().ok())
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + 'static> Computed<T> {
    fn new(runtime: &Runtime, getter: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new(ComputedInner {
            id: ObjectId::next(),
            cached: RefCell::new(None),
            dirty: Cell::new(true), // Computed on first get().
            version: Cell::new(0),
            effect: OnceCell::new(),
            runtime: Rc::downgrade(&runtime.inner),
        });

        let slot = Rc::downgrade(&inner);
        let body = Box::new(move || {
            let value = getter();
            if let Some(inner) = slot.upgrade() {
                *inner.cached.borrow_mut() = Some(value);
            }
        });
        let on_change = Rc::downgrade(&inner);
        let scheduler = Scheduler::queued(move |_| {
            if let Some(inner) = on_change.upgrade() {
                inner.mark_dirty();
            }
        });
        let effect = runtime.inner.create_effect(body, scheduler);
        let _ = inner.effect.set(effect);

        Self { inner }
    }

    /// Get the current value, recomputing if dirty.
    ///
    /// Returns a clone of the cached value and subscribes the running effect
    /// to this computed.
    ///
    /// # Panics
    ///
    /// Panics if the getter reads its own computed before a first value was
    /// cached (a computed cannot depend on itself).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.refresh();
        self.inner.track();
        self.inner
            .cached
            .borrow()
            .as_ref()
            .expect("computed getter read its own value before producing one")
            .clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// Forces recomputation if dirty and tracks like [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Same condition as [`get`](Self::get).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.refresh();
        self.inner.track();
        let cached = self.inner.cached.borrow();
        f(cached
            .as_ref()
            .expect("computed getter read its own value before producing one"))
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force invalidation of the cached value and notify dependents. The
    /// next `get()` will recompute.
    pub fn invalidate(&self) {
        self.inner.mark_dirty();
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Target identity of this derived value.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }
}

impl Runtime {
    /// A lazily evaluated, memoized value. `getter` first runs on the first
    /// `get()`.
    pub fn computed<T: Clone + 'static>(&self, getter: impl Fn() -> T + 'static) -> Computed<T> {
        Computed::new(self, getter)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObjectRef, Reactive};

    fn counter_state(rt: &Runtime, n: i32) -> Reactive {
        rt.reactive(&ObjectRef::record([("n", n)]))
    }

    fn num(state: &Reactive, key: &str) -> f64 {
        state.get(key).as_f64().unwrap_or_default()
    }

    #[test]
    fn single_dep_computed() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 10);
        let s = source.clone();
        let computed = rt.computed(move || num(&s, "n") * 2.0);

        assert_eq!(computed.get(), 20.0);
        assert_eq!(computed.version(), 1);

        source.set("n", 5);
        assert!(computed.is_dirty());
        assert_eq!(computed.get(), 10.0);
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn multi_dep_computed() {
        let rt = Runtime::new();
        let size = rt.reactive(&ObjectRef::record([("width", 10), ("height", 20)]));
        let s = size.clone();
        let area = rt.computed(move || num(&s, "width") * num(&s, "height"));

        assert_eq!(area.get(), 200.0);

        size.set("width", 5);
        assert_eq!(area.get(), 100.0);

        size.set("height", 30);
        assert_eq!(area.get(), 150.0);
    }

    #[test]
    fn lazy_evaluation() {
        let rt = Runtime::new();
        let getter_runs = Rc::new(Cell::new(0u32));
        let runs = Rc::clone(&getter_runs);

        let source = counter_state(&rt, 42);
        let s = source.clone();
        let computed = rt.computed(move || {
            runs.set(runs.get() + 1);
            num(&s, "n") * 2.0
        });

        // Not computed yet.
        assert_eq!(getter_runs.get(), 0);

        // Writes before the first get do not compute either.
        source.set("n", 1);
        assert_eq!(getter_runs.get(), 0);

        // The first get runs the getter.
        assert_eq!(computed.get(), 2.0);
        assert_eq!(getter_runs.get(), 1);

        // Second get returns cached.
        assert_eq!(computed.get(), 2.0);
        assert_eq!(getter_runs.get(), 1);
    }

    #[test]
    fn memoization() {
        let rt = Runtime::new();
        let getter_runs = Rc::new(Cell::new(0u32));
        let runs = Rc::clone(&getter_runs);

        let source = counter_state(&rt, 10);
        let s = source.clone();
        let computed = rt.computed(move || {
            runs.set(runs.get() + 1);
            num(&s, "n") * 2.0
        });

        // First get.
        assert_eq!(computed.get(), 20.0);
        assert_eq!(getter_runs.get(), 1);

        // Two writes, still no recompute until the next get.
        source.set("n", 20);
        source.set("n", 30);
        assert_eq!(getter_runs.get(), 1);
        assert_eq!(computed.get(), 60.0);
        assert_eq!(getter_runs.get(), 2);

        // Cached again.
        assert_eq!(computed.get(), 60.0);
        assert_eq!(getter_runs.get(), 2);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let rt = Runtime::new();
        let getter_runs = Rc::new(Cell::new(0u32));
        let runs = Rc::clone(&getter_runs);
        let computed = rt.computed(move || {
            runs.set(runs.get() + 1);
            7
        });

        assert_eq!(computed.get(), 7);
        assert_eq!(getter_runs.get(), 1);

        computed.invalidate();
        assert!(computed.is_dirty());
        assert_eq!(computed.get(), 7);
        assert_eq!(getter_runs.get(), 2);
    }

    #[test]
    fn with_access() {
        let rt = Runtime::new();
        let name = rt.new_ref("weft");
        let n = name.clone();
        let computed = rt.computed(move || n.get().as_str().unwrap_or_default().to_uppercase());
        let len = computed.with(String::len);
        assert_eq!(len, 4);
        assert_eq!(computed.version(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 1);
        let s = source.clone();
        let c1 = rt.computed(move || num(&s, "n") + 100.0);
        let c2 = c1.clone();

        assert_eq!(c1.get(), 101.0);
        assert_eq!(c2.version(), 1);

        source.set("n", 2);
        assert!(c2.is_dirty());
        assert_eq!(c2.get(), 102.0);
        assert_eq!(c1.version(), 2);
    }

    #[test]
    fn effects_see_computed_changes() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 1);
        let s = source.clone();
        let doubled = rt.computed(move || num(&s, "n") * 2.0);

        let seen = Rc::new(Cell::new(0.0));
        let (d, out) = (doubled.clone(), Rc::clone(&seen));
        let effect = rt.effect(move || out.set(d.get()));
        assert_eq!(seen.get(), 2.0);

        source.set("n", 4);
        assert_eq!(seen.get(), 8.0);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn diamond_dependency() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 1);
        let (s1, s2) = (source.clone(), source.clone());
        let left = rt.computed(move || num(&s1, "n") + 1.0);
        let right = rt.computed(move || num(&s2, "n") * 10.0);
        let (l, r) = (left.clone(), right.clone());
        let sum = rt.computed(move || l.get() + r.get());

        assert_eq!(sum.get(), 12.0);
        source.set("n", 2);
        assert_eq!(sum.get(), 23.0);
    }

    #[test]
    fn chained_computed_stays_lazy() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 1);
        let s = source.clone();
        let base = rt.computed(move || num(&s, "n"));
        let b = base.clone();
        let derived = rt.computed(move || b.get() * 3.0);

        assert_eq!(derived.get(), 3.0);
        source.set("n", 2);
        assert!(base.is_dirty());
        assert!(derived.is_dirty());
        assert_eq!(derived.get(), 6.0);
        assert!(!base.is_dirty());
    }

    #[test]
    fn debug_format() {
        let rt = Runtime::new();
        let computed = rt.computed(|| 42);
        let _ = computed.get();
        let dbg = format!("{computed:?}");
        assert!(dbg.contains("Computed"));
        assert!(dbg.contains("42"));
    }

    #[test]
    fn dropping_computed_releases_subscriptions() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 1);
        let s = source.clone();
        let computed = rt.computed(move || num(&s, "n"));
        let _ = computed.get();
        assert_eq!(rt.stats().subscriptions, 1);
        drop(computed);
        assert_eq!(rt.stats().subscriptions, 0);
    }

    #[test]
    fn many_updates_version_monotonic() {
        let rt = Runtime::new();
        let source = counter_state(&rt, 0);
        let s = source.clone();
        let computed = rt.computed(move || num(&s, "n"));

        let mut last_version = 0;
        for i in 1..=20 {
            source.set("n", i);
            let _ = computed.get();
            let v = computed.version();
            assert!(v > last_version);
            last_version = v;
        }
        assert_eq!(last_version, 20);
    }
}
