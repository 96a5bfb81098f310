#![forbid(unsafe_code)]

//! Set and map methods.
//!
//! Reads track either one entry key or the whole key set; writes store raw
//! values (wrappers are unwrapped on the way in). Iteration takes a snapshot
//! of the raw contents before any callback runs, so callbacks are free to
//! mutate the collection.

use super::{Observed, Reactive};
use crate::store::{ChangeKind, TrackKey};
use crate::value::{ObjectKind, RawObject, Value};

impl Reactive {
    fn expect_collection(&self, op: &'static str) -> bool {
        if self.kind().is_collection() {
            true
        } else {
            self.unsupported(op);
            false
        }
    }

    fn expect_map(&self, op: &'static str) -> bool {
        if self.kind() == ObjectKind::Map {
            true
        } else {
            self.unsupported(op);
            false
        }
    }

    /// Number of entries. Tracks the key set.
    pub fn size(&self) -> usize {
        if !self.expect_collection("size") {
            return 0;
        }
        self.track(TrackKey::Iterate);
        self.raw().len()
    }

    /// Whether `key` is a member (set) or a key (map). Tracks that entry.
    pub fn contains(&self, key: impl Into<Value>) -> bool {
        if !self.expect_collection("contains") {
            return false;
        }
        let key = key.into();
        self.track(TrackKey::Entry(key.clone()));
        match &*self.raw().borrow() {
            RawObject::Set(set) => set.contains(&key),
            RawObject::Map(map) => map.contains_key(&key),
            _ => false,
        }
    }

    /// Add a member to a set. Returns `true` if it was not present.
    pub fn add(&self, value: impl Into<Value>) -> bool {
        if self.kind() != ObjectKind::Set {
            self.unsupported("add");
            return false;
        }
        let value = value.into();
        if self.is_readonly() {
            self.reject_write("add", &value);
            return false;
        }
        let added = match &mut *self.raw().borrow_mut() {
            RawObject::Set(set) => set.insert(value.clone()),
            _ => false,
        };
        if added {
            self.notify(TrackKey::Entry(value), ChangeKind::Add, None);
        }
        added
    }

    /// Remove a set member or map key. Returns `true` if it was present.
    pub fn remove(&self, key: impl Into<Value>) -> bool {
        if !self.expect_collection("remove") {
            return false;
        }
        let key = key.into();
        if self.is_readonly() {
            self.reject_write("remove", &key);
            return false;
        }
        let removed = match &mut *self.raw().borrow_mut() {
            RawObject::Set(set) => set.shift_remove(&key),
            RawObject::Map(map) => map.shift_remove(&key).is_some(),
            _ => false,
        };
        if removed {
            self.notify(TrackKey::Entry(key), ChangeKind::Delete, None);
        }
        removed
    }

    /// Map lookup. Tracks the key; object values come back wrapped.
    pub fn lookup(&self, key: impl Into<Value>) -> Observed {
        if !self.expect_map("lookup") {
            return Observed::NULL;
        }
        let key = key.into();
        self.track(TrackKey::Entry(key.clone()));
        let found = match &*self.raw().borrow() {
            RawObject::Map(map) => map.get(&key).cloned(),
            _ => None,
        };
        found.map_or(Observed::NULL, |value| self.observe(value))
    }

    /// Map insert. Tracks nothing; stores the raw value. Notifies `Add` for
    /// a new key and `Set` when an existing key's value changes. Returns
    /// `true` if anything changed.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> bool {
        if !self.expect_map("insert") {
            return false;
        }
        let (key, value) = (key.into(), value.into());
        if self.is_readonly() {
            self.reject_write("insert", &key);
            return false;
        }
        let change = match &mut *self.raw().borrow_mut() {
            RawObject::Map(map) => match map.get_mut(&key) {
                Some(slot) if slot.same(&value) => None,
                Some(slot) => {
                    *slot = value;
                    Some(ChangeKind::Set)
                }
                None => {
                    map.insert(key.clone(), value);
                    Some(ChangeKind::Add)
                }
            },
            _ => None,
        };
        match change {
            Some(change) => {
                self.notify(TrackKey::Entry(key), change, None);
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Every reader of this collection is notified.
    pub fn clear(&self) {
        if !self.expect_collection("clear") {
            return;
        }
        if self.is_readonly() {
            self.reject_write("clear", &"*");
            return;
        }
        let had_entries = {
            let mut data = self.raw().borrow_mut();
            let had = !data.is_empty();
            match &mut *data {
                RawObject::Set(set) => set.clear(),
                RawObject::Map(map) => map.clear(),
                _ => {}
            }
            had
        };
        if had_entries {
            self.notify(TrackKey::Iterate, ChangeKind::Clear, None);
        }
    }

    /// Raw `(key, value)` pairs; set members pair with themselves.
    fn snapshot(&self) -> Vec<(Value, Value)> {
        match &*self.raw().borrow() {
            RawObject::Set(set) => set.iter().map(|v| (v.clone(), v.clone())).collect(),
            RawObject::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }

    /// Call `f(value, key)` for every entry. Tracks the key set.
    pub fn for_each(&self, mut f: impl FnMut(Observed, Observed)) {
        if !self.expect_collection("for_each") {
            return;
        }
        self.track(TrackKey::Iterate);
        for (key, value) in self.snapshot() {
            f(self.observe(value), self.observe(key));
        }
    }

    /// Values in insertion order. Tracks the key set.
    pub fn values(&self) -> Vec<Observed> {
        if !self.expect_collection("values") {
            return Vec::new();
        }
        self.track(TrackKey::Iterate);
        self.snapshot()
            .into_iter()
            .map(|(_, value)| self.observe(value))
            .collect()
    }

    /// `(key, value)` pairs in insertion order. Tracks the key set.
    pub fn entries(&self) -> Vec<(Observed, Observed)> {
        if !self.expect_collection("entries") {
            return Vec::new();
        }
        self.track(TrackKey::Iterate);
        self.snapshot()
            .into_iter()
            .map(|(key, value)| (self.observe(key), self.observe(value)))
            .collect()
    }

    /// Keys in insertion order. On a map this tracks only key additions and
    /// removals, so value updates do not notify; on a set it is `values`.
    pub fn keys(&self) -> Vec<Observed> {
        match self.kind() {
            ObjectKind::Map => {
                self.track(TrackKey::MapKeyIterate);
                self.snapshot()
                    .into_iter()
                    .map(|(key, _)| self.observe(key))
                    .collect()
            }
            ObjectKind::Set => self.values(),
            ObjectKind::Record | ObjectKind::Sequence => {
                self.unsupported("keys");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::{ObjectRef, Runtime, Value};

    fn runs(rt: &Runtime, f: impl Fn() + 'static) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        rt.effect(move || {
            c.set(c.get() + 1);
            f();
        });
        count
    }

    #[test]
    fn set_size_follows_membership() {
        let rt = Runtime::new();
        let set = rt.reactive(&ObjectRef::set([1, 2, 3]));
        let s = set.clone();
        let seen = Rc::new(Cell::new(0));
        let out = Rc::clone(&seen);
        rt.effect(move || out.set(s.size()));
        assert_eq!(seen.get(), 3);

        assert!(set.remove(1));
        assert_eq!(seen.get(), 2);
        // Already absent: no change, no notification.
        assert!(!set.remove(1));
        assert!(set.add(9));
        assert!(!set.add(9));
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn map_lookup_tracks_single_key() {
        let rt = Runtime::new();
        let map = rt.reactive(&ObjectRef::map([("a", 1), ("b", 2)]));
        let m = map.clone();
        let count = runs(&rt, move || {
            let _ = m.lookup("a");
        });
        map.insert("b", 3);
        assert_eq!(count.get(), 1);
        map.insert("a", 5);
        assert_eq!(count.get(), 2);
        map.insert("a", 5);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn map_value_update_notifies_value_iteration_not_keys() {
        let rt = Runtime::new();
        let map = rt.reactive(&ObjectRef::map([("a", 1)]));
        let (m1, m2) = (map.clone(), map.clone());
        let values = runs(&rt, move || {
            let _ = m1.values();
        });
        let keys = runs(&rt, move || {
            let _ = m2.keys();
        });

        map.insert("a", 2);
        assert_eq!(values.get(), 2);
        assert_eq!(keys.get(), 1);

        map.insert("b", 1);
        assert_eq!(values.get(), 3);
        assert_eq!(keys.get(), 2);

        map.remove("a");
        assert_eq!(keys.get(), 3);
    }

    #[test]
    fn insert_stores_raw_values() {
        let rt = Runtime::new();
        let inner = ObjectRef::record([("n", 1)]);
        let map = rt.reactive(&ObjectRef::map(Vec::<(Value, Value)>::new()));
        map.insert("obj", rt.reactive(&inner));
        let stored = map.raw().borrow();
        let crate::value::RawObject::Map(entries) = &*stored else {
            panic!("expected map");
        };
        assert_eq!(entries.get(&Value::from("obj")), Some(&Value::from(&inner)));
    }

    #[test]
    fn lookup_wraps_object_values() {
        let rt = Runtime::new();
        let inner = ObjectRef::record([("n", 1)]);
        let map = rt.reactive(&ObjectRef::map([("obj", Value::from(&inner))]));
        let found = map.lookup("obj").into_reactive().unwrap();
        assert!(crate::Reactive::ptr_eq(&found, &rt.reactive(&inner)));
        assert!(map.lookup("missing").is_null());
    }

    #[test]
    fn clear_notifies_every_reader() {
        let rt = Runtime::new();
        let map = rt.reactive(&ObjectRef::map([("a", 1)]));
        let m = map.clone();
        let count = runs(&rt, move || {
            let _ = m.contains("a");
        });
        map.clear();
        assert_eq!(count.get(), 2);
        assert_eq!(map.raw().len(), 0);
        // Clearing an empty map changes nothing.
        map.clear();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn for_each_passes_value_then_key() {
        let rt = Runtime::new();
        let map = rt.reactive(&ObjectRef::map([("k", 7)]));
        let mut seen = Vec::new();
        map.for_each(|value, key| seen.push((value.to_value(), key.to_value())));
        assert_eq!(seen, vec![(Value::from(7), Value::from("k"))]);
        let entries = map.entries();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn readonly_collection_rejects_writes() {
        let rt = Runtime::new();
        let raw = ObjectRef::set([1]);
        let ro = rt.readonly(&raw);
        assert!(!ro.add(2));
        assert!(!ro.remove(1));
        ro.clear();
        assert_eq!(raw.len(), 1);
        assert_eq!(rt.stats().readonly_violations, 3);
        assert!(ro.contains(1));
    }
}
