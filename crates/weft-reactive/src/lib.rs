#![forbid(unsafe_code)]

//! Fine-grained reactivity.
//!
//! Reads through an observable wrapper subscribe the running computation to
//! the `(object, key)` they touched; writes re-run exactly the computations
//! subscribed to what changed.
//!
//! - [`Runtime`]: owns the dependency store, the wrapper cache and the job
//!   queue. Everything else is created from it.
//! - [`Reactive`]: explicit accessor over a raw record, sequence, set or map.
//! - [`Effect`]: a tracked computation, re-run on change.
//! - [`Computed`]: a lazy, memoized derived value.
//! - [`Runtime::watch`]: callback on change, with old and new values.
//! - [`Ref`]: a single observable value.
//!
//! # Architecture
//!
//! All state is single-threaded (`Rc`/`RefCell`). The runtime is an explicit
//! value rather than a process global, so independent runtimes never see
//! each other's dependencies. Wrappers and effects refer back to it weakly.
//!
//! # Invariants
//!
//! 1. A write notifies each subscribed computation exactly once.
//! 2. Writing a value identical to the current one (`NaN` included)
//!    notifies nobody.
//! 3. A computation never re-triggers itself while it is running.
//! 4. One wrapper exists per (raw object, mode).

pub mod computed;
pub mod effect;
pub mod error;
pub mod proxy;
pub mod refs;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod value;
pub mod watch;

pub use computed::Computed;
pub use effect::{Effect, EffectId, EffectOptions};
pub use error::{ReactiveError, Result};
pub use proxy::{AsRawObject, Observed, PropKey, Reactive, WrapMode};
pub use refs::{Ref, RefUnwrap};
pub use runtime::{Runtime, RuntimeStats};
pub use scheduler::{BatchScope, JobId, Scheduler, TrackingPause};
pub use store::{ChangeKind, DependencyStore, TargetKind, TrackKey};
pub use value::{ObjectId, ObjectKind, ObjectRef, RawObject, Record, Value};
pub use watch::{Flush, OnInvalidate, WatchHandle, WatchOptions};
pub use weft_core::RuntimeConfig;
