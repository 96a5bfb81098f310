#![forbid(unsafe_code)]

//! Observable wrappers.
//!
//! A [`Reactive`] is an explicit accessor over one raw object. Reads through
//! it subscribe the running effect; writes through it notify subscribers.
//! Which methods apply depends on the object kind:
//!
//! - records and sequences: [`get`](Reactive::get), [`set`](Reactive::set),
//!   [`has`](Reactive::has), [`delete`](Reactive::delete),
//!   [`own_keys`](Reactive::own_keys), plus the sequence methods (`push`,
//!   `splice`, `includes`, ...);
//! - sets and maps: [`size`](Reactive::size), [`add`](Reactive::add),
//!   [`lookup`](Reactive::lookup), [`insert`](Reactive::insert), iteration.
//!
//! Calling a method on the wrong kind logs a warning and returns a neutral
//! result.
//!
//! # Invariants
//!
//! 1. The runtime hands out exactly one wrapper per (raw object, mode).
//! 2. Read-only wrappers never track and never write.
//! 3. Deep wrappers return nested objects wrapped in the same mode; shallow
//!    wrappers return them raw.

mod collection;
mod record;
mod sequence;

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;
use weft_core::RuntimeConfig;

use crate::refs::Ref;
use crate::runtime::RuntimeInner;
use crate::scheduler::TrackingPause;
use crate::store::{ChangeKind, TrackKey};
use crate::value::{ObjectId, ObjectKind, ObjectRef, Value};

/// Wrapping variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WrapMode {
    /// Nested objects are returned raw instead of wrapped.
    pub shallow: bool,
    /// Writes are rejected and reads are not tracked.
    pub readonly: bool,
}

impl WrapMode {
    pub const DEEP: Self = Self {
        shallow: false,
        readonly: false,
    };
    pub const SHALLOW: Self = Self {
        shallow: true,
        readonly: false,
    };
    pub const READONLY: Self = Self {
        shallow: false,
        readonly: true,
    };
    pub const SHALLOW_READONLY: Self = Self {
        shallow: true,
        readonly: true,
    };
}

/// Anything that resolves to a raw object: the object itself or a wrapper
/// of it.
pub trait AsRawObject {
    fn as_raw_object(&self) -> &ObjectRef;
}

impl AsRawObject for ObjectRef {
    fn as_raw_object(&self) -> &ObjectRef {
        self
    }
}

impl AsRawObject for Reactive {
    fn as_raw_object(&self) -> &ObjectRef {
        self.raw()
    }
}

/// Property key of a record or sequence.
///
/// Sequences accept `Index(i)`, the name `"length"`, and canonical decimal
/// names (`"2"`); records turn indices into names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    Name(Rc<str>),
    Index(usize),
}

/// A key resolved against a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeqSlot {
    Index(usize),
    Length,
}

impl PropKey {
    /// The key as a record field name.
    #[must_use]
    pub fn name(&self) -> Rc<str> {
        match self {
            Self::Name(name) => Rc::clone(name),
            Self::Index(i) => Rc::from(i.to_string()),
        }
    }

    pub(crate) fn seq_slot(&self) -> Option<SeqSlot> {
        match self {
            Self::Index(i) => Some(SeqSlot::Index(*i)),
            Self::Name(name) if &**name == "length" => Some(SeqSlot::Length),
            Self::Name(name) => name
                .parse::<usize>()
                .ok()
                .filter(|i| i.to_string() == **name)
                .map(SeqSlot::Index),
        }
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        Self::Name(Rc::from(name))
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        Self::Name(Rc::from(name))
    }
}

impl From<Rc<str>> for PropKey {
    fn from(name: Rc<str>) -> Self {
        Self::Name(name)
    }
}

impl From<&PropKey> for PropKey {
    fn from(key: &PropKey) -> Self {
        key.clone()
    }
}

impl From<usize> for PropKey {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<i32> for PropKey {
    fn from(i: i32) -> Self {
        usize::try_from(i).map_or_else(|_| Self::Name(Rc::from(i.to_string())), Self::Index)
    }
}

/// Result of a read through a wrapper.
#[derive(Clone, Debug)]
pub enum Observed {
    /// A scalar, a ref, or a raw object from a shallow wrapper.
    Value(Value),
    /// A nested object, wrapped in the reader's mode.
    Reactive(Reactive),
}

impl Observed {
    pub const NULL: Self = Self::Value(Value::Null);

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => v.as_f64(),
            Self::Reactive(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Value(v) => v.as_bool(),
            Self::Reactive(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(v) => v.as_str(),
            Self::Reactive(_) => None,
        }
    }

    #[must_use]
    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Self::Reactive(r) => Some(r),
            Self::Value(_) => None,
        }
    }

    #[must_use]
    pub fn into_reactive(self) -> Option<Reactive> {
        match self {
            Self::Reactive(r) => Some(r),
            Self::Value(_) => None,
        }
    }

    #[must_use]
    pub fn ref_handle(&self) -> Option<&Ref> {
        match self {
            Self::Value(v) => v.ref_handle(),
            Self::Reactive(_) => None,
        }
    }

    /// The raw value: wrappers resolve to their source object.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(v) => v,
            Self::Reactive(r) => Value::Object(r.raw().clone()),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }
}

impl PartialEq for Observed {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a.same(b),
            (Self::Reactive(a), Self::Reactive(b)) => Reactive::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => v.fmt(f),
            Self::Reactive(r) => write!(f, "[reactive {} #{}]", r.kind(), r.id().raw()),
        }
    }
}

impl From<Value> for Observed {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Reactive> for Observed {
    fn from(r: Reactive) -> Self {
        Self::Reactive(r)
    }
}

impl From<&Reactive> for Observed {
    fn from(r: &Reactive) -> Self {
        Self::Reactive(r.clone())
    }
}

impl From<ObjectRef> for Observed {
    fn from(o: ObjectRef) -> Self {
        Self::Value(Value::Object(o))
    }
}

impl From<&ObjectRef> for Observed {
    fn from(o: &ObjectRef) -> Self {
        Self::Value(Value::Object(o.clone()))
    }
}

impl From<f64> for Observed {
    fn from(n: f64) -> Self {
        Self::Value(Value::from(n))
    }
}

impl From<i32> for Observed {
    fn from(n: i32) -> Self {
        Self::Value(Value::from(n))
    }
}

impl From<bool> for Observed {
    fn from(b: bool) -> Self {
        Self::Value(Value::from(b))
    }
}

impl From<&str> for Observed {
    fn from(s: &str) -> Self {
        Self::Value(Value::from(s))
    }
}

impl From<Observed> for Value {
    fn from(o: Observed) -> Self {
        o.into_value()
    }
}

impl From<Reactive> for Value {
    fn from(r: Reactive) -> Self {
        Value::Object(r.raw().clone())
    }
}

impl From<&Reactive> for Value {
    fn from(r: &Reactive) -> Self {
        Value::Object(r.raw().clone())
    }
}

struct ReactiveInner {
    raw: ObjectRef,
    mode: WrapMode,
    runtime: Weak<RuntimeInner>,
}

/// Observable wrapper over a raw object. Obtain one from
/// [`Runtime::reactive`](crate::Runtime::reactive) and friends.
///
/// Cloning yields another handle to the **same** wrapper.
///
/// # Read-only wrappers
///
/// Every write through a read-only wrapper leaves the source untouched,
/// counts a violation and (unless `warn_on_readonly` is off) logs a
/// warning. The return values differ by operation:
///
/// | Operation | Returns |
/// |-----------|---------|
/// | [`set`](Self::set), [`delete`](Self::delete), [`set_len`](Self::set_len) | `true`, so assignment-style callers treat the write as handled |
/// | [`add`](Self::add), [`remove`](Self::remove), [`insert`](Self::insert) | `false`: nothing changed |
/// | [`push`](Self::push), [`extend`](Self::extend), [`unshift`](Self::unshift) | the current length |
/// | [`pop`](Self::pop), [`shift`](Self::shift) | `Null` |
/// | [`splice`](Self::splice) | no removed elements |
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ReactiveInner>,
}

impl Reactive {
    pub(crate) fn new(raw: ObjectRef, mode: WrapMode, runtime: Weak<RuntimeInner>) -> Self {
        Self {
            inner: Rc::new(ReactiveInner { raw, mode, runtime }),
        }
    }

    /// The raw source object. Reads and writes through it are untracked.
    #[must_use]
    pub fn raw(&self) -> &ObjectRef {
        &self.inner.raw
    }

    /// Target identity (the raw object's id).
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.raw.id()
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.inner.raw.kind()
    }

    #[must_use]
    pub fn mode(&self) -> WrapMode {
        self.inner.mode
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.inner.mode.readonly
    }

    #[must_use]
    pub fn is_shallow(&self) -> bool {
        self.inner.mode.shallow
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    fn live_runtime(&self) -> Option<Rc<RuntimeInner>> {
        self.inner.runtime.upgrade().filter(|rt| !rt.disposed.get())
    }

    pub(crate) fn track(&self, key: TrackKey) {
        if self.inner.mode.readonly {
            return;
        }
        if let Some(rt) = self.live_runtime() {
            rt.track(self.id(), key);
        }
    }

    pub(crate) fn notify(&self, key: TrackKey, change: ChangeKind, new_len: Option<usize>) {
        if let Some(rt) = self.live_runtime() {
            rt.notify(self.id(), self.kind().into(), key, change, new_len);
        }
    }

    /// A wrapper of `raw` in this wrapper's mode.
    pub(crate) fn sibling(&self, raw: &ObjectRef) -> Option<Self> {
        self.inner
            .runtime
            .upgrade()
            .map(|rt| rt.wrap(raw, self.inner.mode))
    }

    /// Present a raw value read from this target.
    pub(crate) fn observe(&self, value: Value) -> Observed {
        match value {
            Value::Object(obj) if !self.inner.mode.shallow => match self.sibling(&obj) {
                Some(wrapped) => Observed::Reactive(wrapped),
                None => Observed::Value(Value::Object(obj)),
            },
            other => Observed::Value(other),
        }
    }

    pub(crate) fn pause_tracking(&self) -> Option<TrackingPause> {
        self.inner.runtime.upgrade().map(TrackingPause::new)
    }

    /// Record and report a write refused by a read-only wrapper.
    pub(crate) fn reject_write(&self, op: &'static str, key: &dyn fmt::Display) {
        let warn_enabled = match self.inner.runtime.upgrade() {
            Some(rt) => {
                rt.record_readonly_violation();
                rt.config.warn_on_readonly
            }
            None => true,
        };
        if warn_enabled {
            warn!(
                target_id = self.id().raw(),
                kind = %self.kind(),
                key = %key,
                op,
                "write rejected: target is read-only"
            );
        }
    }

    /// Whether a sequence may grow to `len` under the runtime's
    /// `max_sequence_len`. Logs a warning when it may not.
    pub(crate) fn fits_length(&self, op: &'static str, len: usize) -> bool {
        let max = self
            .inner
            .runtime
            .upgrade()
            .map_or(RuntimeConfig::default().max_sequence_len, |rt| {
                rt.config.max_sequence_len
            });
        if len <= max as usize {
            return true;
        }
        warn!(
            target_id = self.id().raw(),
            op,
            len,
            max,
            "write rejected: sequence length out of range"
        );
        false
    }

    pub(crate) fn unsupported(&self, op: &'static str) {
        warn!(
            target_id = self.id().raw(),
            kind = %self.kind(),
            op,
            "operation not supported for this kind"
        );
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("raw", &self.inner.raw)
            .field("mode", &self.inner.mode)
            .finish()
    }
}
