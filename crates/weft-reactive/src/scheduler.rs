#![forbid(unsafe_code)]

//! Scheduling: how a notified effect gets re-run, and the post-flush job
//! queue that deferred work lands in.
//!
//! The queue is keyed by [`JobId`]; queueing an id that is already pending
//! is a no-op, so a watch notified ten times before the next flush runs its
//! job once. [`Runtime::flush`](crate::Runtime::flush) drains it.
//!
//! [`BatchScope`] marks a synchronous unit of work. Nested scopes are
//! allowed; the queue is flushed when the outermost one drops.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::error;

use crate::effect::{Effect, EffectId};
use crate::runtime::RuntimeInner;

/// How a notified effect is re-run.
#[derive(Clone, Default)]
pub enum Scheduler {
    /// Run the effect synchronously, inside the notifying write.
    #[default]
    Immediate,
    /// Hand the effect to a caller-supplied function. The function decides
    /// when (and whether) to call [`Effect::run`].
    Queued(Rc<dyn Fn(&Effect)>),
}

impl Scheduler {
    /// Build a [`Scheduler::Queued`] from a closure.
    pub fn queued(f: impl Fn(&Effect) + 'static) -> Self {
        Self::Queued(Rc::new(f))
    }

    #[must_use]
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("Immediate"),
            Self::Queued(_) => f.write_str("Queued(..)"),
        }
    }
}

/// Key of a pending job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobId {
    /// Job owned by an effect (one pending job per effect).
    Effect(EffectId),
    /// Caller-chosen id.
    Custom(u64),
}

pub(crate) type Job = Box<dyn FnOnce()>;

/// Insertion-ordered, coalescing job queue.
#[derive(Default)]
pub(crate) struct JobQueue {
    pending: IndexMap<JobId, Job>,
}

impl JobQueue {
    /// Enqueue `job` under `id`. Returns `false` (and drops `job`) if `id`
    /// is already pending.
    pub(crate) fn push(&mut self, id: JobId, job: Job) -> bool {
        if self.pending.contains_key(&id) {
            return false;
        }
        self.pending.insert(id, job);
        true
    }

    /// Take every pending job, oldest first.
    pub(crate) fn take(&mut self) -> Vec<(JobId, Job)> {
        self.pending.drain(..).collect()
    }

    pub(crate) fn cancel(&mut self, id: JobId) -> bool {
        self.pending.shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pending.keys()).finish()
    }
}

/// RAII guard for a batch. Created by
/// [`Runtime::batch_scope`](crate::Runtime::batch_scope).
///
/// While any scope is alive, work queued on the runtime stays queued. When
/// the outermost scope drops, the queue is flushed; a flush error is logged
/// because `Drop` cannot return it. Use [`Runtime::batch`](crate::Runtime::batch)
/// to receive the error instead.
#[must_use = "the batch ends when the scope is dropped"]
pub struct BatchScope {
    runtime: Rc<RuntimeInner>,
    armed: bool,
}

impl BatchScope {
    pub(crate) fn new(runtime: Rc<RuntimeInner>) -> Self {
        runtime.batch_depth.set(runtime.batch_depth.get() + 1);
        Self {
            runtime,
            armed: true,
        }
    }

    /// End the batch now and return the flush result.
    ///
    /// # Errors
    ///
    /// Returns [`ReactiveError::FlushLimitExceeded`](crate::ReactiveError)
    /// when the outermost scope's flush does not settle.
    pub fn finish(mut self) -> crate::Result<usize> {
        self.armed = false;
        self.end()
    }

    fn end(&self) -> crate::Result<usize> {
        let depth = self.runtime.batch_depth.get().saturating_sub(1);
        self.runtime.batch_depth.set(depth);
        if depth == 0 {
            self.runtime.flush()
        } else {
            Ok(0)
        }
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.end() {
            error!(%err, "batch flush failed");
        }
    }
}

impl fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScope")
            .field("depth", &self.runtime.batch_depth.get())
            .finish()
    }
}

/// RAII guard that suppresses dependency tracking until dropped.
///
/// An effect run inside the paused region re-enables tracking for its own
/// body.
#[must_use = "tracking resumes when the guard is dropped"]
pub struct TrackingPause {
    runtime: Rc<RuntimeInner>,
    previous: bool,
}

impl TrackingPause {
    pub(crate) fn new(runtime: Rc<RuntimeInner>) -> Self {
        let previous = runtime.should_track.replace(false);
        Self { runtime, previous }
    }
}

impl Drop for TrackingPause {
    fn drop(&mut self) {
        self.runtime.should_track.set(self.previous);
    }
}

impl fmt::Debug for TrackingPause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingPause")
            .field("previous", &self.previous)
            .finish()
    }
}
