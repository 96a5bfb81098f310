#![forbid(unsafe_code)]

//! Single-value cells.
//!
//! A [`Ref`] is either its own cell (a reactive record with one `value`
//! field) or a view of one property of another wrapper. Refs are a distinct
//! [`Value`] variant, so a [`RefUnwrap`] view can tell them apart from
//! ordinary values and read through them.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::proxy::{Observed, PropKey, Reactive};
use crate::runtime::Runtime;
use crate::value::{ObjectRef, Value};

const CELL_FIELD: &str = "value";

enum RefSource {
    Cell(Reactive),
    Property { target: Reactive, key: PropKey },
}

/// Observable single-value cell.
///
/// Cloning yields another handle to the **same** cell.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefSource>,
}

impl Ref {
    /// Current value. Tracked like a property read.
    #[must_use]
    pub fn get(&self) -> Observed {
        match &*self.inner {
            RefSource::Cell(cell) => cell.get(CELL_FIELD),
            RefSource::Property { target, key } => target.get(key),
        }
    }

    /// Replace the value. Returns the underlying write's result.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        match &*self.inner {
            RefSource::Cell(cell) => cell.set(CELL_FIELD, value),
            RefSource::Property { target, key } => target.set(key, value),
        }
    }

    /// Whether this ref views a property of another wrapper.
    #[must_use]
    pub fn is_property(&self) -> bool {
        matches!(&*self.inner, RefSource::Property { .. })
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Address used as the identity hash.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner).cast::<()>() as usize
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            RefSource::Cell(cell) => f
                .debug_struct("Ref")
                .field("cell", &cell.id().raw())
                .finish(),
            RefSource::Property { target, key } => f
                .debug_struct("Ref")
                .field("target", &target.id().raw())
                .field("key", key)
                .finish(),
        }
    }
}

/// View over a wrapper that reads through refs stored in it.
///
/// `get` returns a ref's current value instead of the ref; `set` on a key
/// holding a ref writes into the ref instead of replacing it.
#[derive(Clone, Debug)]
pub struct RefUnwrap {
    target: Reactive,
}

impl RefUnwrap {
    pub fn get(&self, key: impl Into<PropKey>) -> Observed {
        match self.target.get(key) {
            Observed::Value(Value::Ref(r)) => r.get(),
            other => other,
        }
    }

    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let existing = self.target.raw().field(&key.name());
        match existing {
            Value::Ref(r) => r.set(value),
            _ => self.target.set(key, value),
        }
    }

    /// The wrapped target.
    #[must_use]
    pub fn target(&self) -> &Reactive {
        &self.target
    }
}

impl Runtime {
    /// A new cell holding `value`.
    pub fn new_ref(&self, value: impl Into<Value>) -> Ref {
        let cell = ObjectRef::record([(CELL_FIELD, value.into())]);
        Ref {
            inner: Rc::new(RefSource::Cell(self.reactive(&cell))),
        }
    }

    /// A ref viewing `target[key]`. Reads and writes go through `target`.
    pub fn to_ref(&self, target: &Reactive, key: impl Into<PropKey>) -> Ref {
        Ref {
            inner: Rc::new(RefSource::Property {
                target: target.clone(),
                key: key.into(),
            }),
        }
    }

    /// One property ref per own key of `target`, in key order.
    pub fn to_refs(&self, target: &Reactive) -> IndexMap<PropKey, Ref> {
        target
            .own_keys()
            .into_iter()
            .map(|key| {
                let r = self.to_ref(target, key.clone());
                (key, r)
            })
            .collect()
    }

    /// A view of `target` that unwraps stored refs.
    pub fn proxy_refs(&self, target: &Reactive) -> RefUnwrap {
        RefUnwrap {
            target: target.clone(),
        }
    }
}
