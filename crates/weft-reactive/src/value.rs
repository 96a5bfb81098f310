#![forbid(unsafe_code)]

//! Raw data model.
//!
//! Observable wrappers sit on top of plain, untracked data. That data is a
//! dynamic value tree: [`Value`] for scalars and references, [`ObjectRef`] for
//! identity-bearing containers (records, sequences, sets, maps).
//!
//! # Invariants
//!
//! 1. Every [`ObjectRef`] has a unique [`ObjectId`] for its whole lifetime;
//!    clones share the id and the storage.
//! 2. Raw storage only holds raw values: converting a wrapper into a
//!    [`Value`] yields its source object, never the wrapper.
//! 3. [`Value`] equality is same-value-zero: `NaN == NaN`, `0.0 == -0.0`,
//!    objects and refs compare by identity. `Hash` agrees with it, so values
//!    can key sets and maps.

use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};

use crate::refs::Ref;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an observable target (raw object or derived value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Container shape of a raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Ordered string-keyed fields with an optional prototype.
    Record,
    /// Dense ordered sequence.
    Sequence,
    /// Insertion-ordered set of values.
    Set,
    /// Insertion-ordered value-keyed map.
    Map,
}

impl ObjectKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Sequence => "sequence",
            Self::Set => "set",
            Self::Map => "map",
        }
    }

    /// Sets and maps expose methods rather than properties.
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Set | Self::Map)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record storage.
///
/// Reads that miss the own fields fall through to `proto`.
#[derive(Debug, Clone, Default)]
pub struct Record {
    pub fields: IndexMap<Rc<str>, Value>,
    pub proto: Option<ObjectRef>,
}

/// Raw container contents.
#[derive(Debug, Clone)]
pub enum RawObject {
    Record(Record),
    Sequence(Vec<Value>),
    Set(IndexSet<Value>),
    Map(IndexMap<Value, Value>),
}

impl RawObject {
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Record(_) => ObjectKind::Record,
            Self::Sequence(_) => ObjectKind::Sequence,
            Self::Set(_) => ObjectKind::Set,
            Self::Map(_) => ObjectKind::Map,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Number of fields, items, or entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Record(r) => r.fields.len(),
            Self::Sequence(items) => items.len(),
            Self::Set(set) => set.len(),
            Self::Map(map) => map.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct ObjectCell {
    id: ObjectId,
    data: RefCell<RawObject>,
}

/// Shared handle to a raw container.
///
/// Cloning yields another handle to the **same** object. Reads and writes
/// through this handle are untracked; go through a wrapper for reactivity.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectCell>);

impl ObjectRef {
    /// Wrap raw contents in a new identity.
    #[must_use]
    pub fn new(data: RawObject) -> Self {
        Self(Rc::new(ObjectCell {
            id: ObjectId::next(),
            data: RefCell::new(data),
        }))
    }

    /// A record from `(name, value)` pairs, in order.
    #[must_use]
    pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        Self::new(RawObject::Record(Record {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            proto: None,
        }))
    }

    /// A record whose missing reads fall through to `proto`.
    #[must_use]
    pub fn record_with_proto<K, V>(fields: impl IntoIterator<Item = (K, V)>, proto: &ObjectRef) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
    {
        let obj = Self::record(fields);
        if let Some(record) = obj.borrow_mut().as_record_mut() {
            record.proto = Some(proto.clone());
        }
        obj
    }

    #[must_use]
    pub fn sequence<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::new(RawObject::Sequence(
            items.into_iter().map(Into::into).collect(),
        ))
    }

    #[must_use]
    pub fn set<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::new(RawObject::Set(items.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::new(RawObject::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.0.data.borrow().kind()
    }

    /// Borrow the raw contents.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently mutably borrowed.
    pub fn borrow(&self) -> CellRef<'_, RawObject> {
        self.0.data.borrow()
    }

    /// Mutably borrow the raw contents. Writes made here notify nobody.
    ///
    /// # Panics
    ///
    /// Panics if the object is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, RawObject> {
        self.0.data.borrow_mut()
    }

    /// Whether both handles point at the same object.
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Untracked own-field read of a record (`Null` if absent).
    #[must_use]
    pub fn field(&self, name: &str) -> Value {
        self.borrow()
            .as_record()
            .and_then(|r| r.fields.get(name).cloned())
            .unwrap_or_default()
    }

    /// Untracked element read of a sequence (`Null` if out of range).
    #[must_use]
    pub fn item(&self, index: usize) -> Value {
        self.borrow()
            .as_sequence()
            .and_then(|items| items.get(index).cloned())
            .unwrap_or_default()
    }

    /// Untracked size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are not printed: objects may contain themselves.
        match self.0.data.try_borrow() {
            Ok(data) => write!(f, "ObjectRef(#{} {} len={})", self.id().raw(), data.kind(), data.len()),
            Err(_) => write!(f, "ObjectRef(#{} <borrowed>)", self.id().raw()),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// A raw value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Object(ObjectRef),
    Ref(Ref),
}

impl Value {
    /// Same-value-zero comparison (`NaN` equals `NaN`).
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => ObjectRef::ptr_eq(a, b),
            (Self::Ref(a), Self::Ref(b)) => Ref::ptr_eq(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(&**s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The ref cell, if this value is one.
    #[must_use]
    pub fn ref_handle(&self) -> Option<&Ref> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Object(o) => match o.0.data.try_borrow() {
                Ok(data) => data.kind().as_str(),
                Err(_) => "object",
            },
            Self::Ref(_) => "ref",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Number(n) => {
                let bits = if n.is_nan() {
                    u64::MAX
                } else if *n == 0.0 {
                    0
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Self::Str(s) => s.hash(state),
            Self::Object(o) => o.hash(state),
            Self::Ref(r) => r.addr().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Object(o) => write!(f, "[{} #{}]", self.type_name(), o.id().raw()),
            Self::Ref(_) => f.write_str("[ref]"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<Rc<str>> for Value {
    fn from(v: Rc<str>) -> Self {
        Self::Str(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Object(v)
    }
}

impl From<&ObjectRef> for Value {
    fn from(v: &ObjectRef) -> Self {
        Self::Object(v.clone())
    }
}

impl From<Ref> for Value {
    fn from(v: Ref) -> Self {
        Self::Ref(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
