#![forbid(unsafe_code)]

//! Property access shared by records and sequences.

use std::rc::Rc;

use super::{Observed, PropKey, Reactive, SeqSlot};
use crate::store::{ChangeKind, TrackKey};
use crate::value::{ObjectKind, Value};

impl Reactive {
    /// Read a property (records) or element/length (sequences).
    ///
    /// Record reads that miss the own fields continue on the prototype,
    /// through the prototype's own wrapper.
    pub fn get(&self, key: impl Into<PropKey>) -> Observed {
        let key = key.into();
        match self.kind() {
            ObjectKind::Record => self.record_get(key.name()),
            ObjectKind::Sequence => match key.seq_slot() {
                Some(SeqSlot::Index(i)) => self.index_get(i),
                Some(SeqSlot::Length) => Observed::Value(Value::from(self.len())),
                None => {
                    self.unsupported("get");
                    Observed::NULL
                }
            },
            ObjectKind::Set | ObjectKind::Map => {
                self.unsupported("get");
                Observed::NULL
            }
        }
    }

    fn record_get(&self, name: Rc<str>) -> Observed {
        self.track(TrackKey::Prop(Rc::clone(&name)));
        let (own, proto) = {
            let data = self.raw().borrow();
            match data.as_record() {
                Some(record) => (record.fields.get(&*name).cloned(), record.proto.clone()),
                None => (None, None),
            }
        };
        match (own, proto) {
            (Some(value), _) => self.observe(value),
            (None, Some(proto)) => match self.sibling(&proto) {
                Some(parent) => parent.record_get(name),
                None => Observed::Value(proto.field(&name)),
            },
            (None, None) => Observed::NULL,
        }
    }

    pub(crate) fn index_get(&self, index: usize) -> Observed {
        self.track(TrackKey::Index(index));
        let value = self.raw().item(index);
        self.observe(value)
    }

    /// Write a property or element. Writing `"length"` on a sequence
    /// truncates or pads it.
    ///
    /// The write lands on this object's own fields even when the key was
    /// found on the prototype. Writing a value identical to the current one
    /// (same-value-zero) notifies nobody. Returns `true` on success; a
    /// read-only wrapper refuses the write but still reports success. A
    /// sequence write that would grow past `max_sequence_len` returns
    /// `false` and changes nothing.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        if self.is_readonly() {
            self.reject_write("set", &key);
            return true;
        }
        match self.kind() {
            ObjectKind::Record => {
                self.record_set(key.name(), value);
                true
            }
            ObjectKind::Sequence => match key.seq_slot() {
                Some(SeqSlot::Index(i)) => self.index_set(i, value),
                // `as` saturates, so huge lengths fall to the limit check.
                Some(SeqSlot::Length) => match value.as_f64() {
                    Some(n) if n >= 0.0 && n.fract() == 0.0 => self.set_len(n as usize),
                    _ => {
                        self.unsupported("set length");
                        false
                    }
                },
                None => {
                    self.unsupported("set");
                    false
                }
            },
            ObjectKind::Set | ObjectKind::Map => {
                self.unsupported("set");
                false
            }
        }
    }

    fn record_set(&self, name: Rc<str>, value: Value) {
        let change = {
            let mut data = self.raw().borrow_mut();
            let Some(record) = data.as_record_mut() else {
                return;
            };
            match record.fields.get_mut(&*name) {
                Some(slot) if slot.same(&value) => None,
                Some(slot) => {
                    *slot = value;
                    Some(ChangeKind::Set)
                }
                None => {
                    record.fields.insert(Rc::clone(&name), value);
                    Some(ChangeKind::Add)
                }
            }
        };
        if let Some(change) = change {
            self.notify(TrackKey::Prop(name), change, None);
        }
    }

    /// Whether a property exists (records: own or inherited) or an index is
    /// in range (sequences).
    pub fn has(&self, key: impl Into<PropKey>) -> bool {
        let key = key.into();
        match self.kind() {
            ObjectKind::Record => self.record_has(key.name()),
            ObjectKind::Sequence => match key.seq_slot() {
                Some(SeqSlot::Index(i)) => {
                    self.track(TrackKey::Index(i));
                    i < self.raw().len()
                }
                Some(SeqSlot::Length) => true,
                None => false,
            },
            ObjectKind::Set | ObjectKind::Map => {
                self.unsupported("has");
                false
            }
        }
    }

    fn record_has(&self, name: Rc<str>) -> bool {
        self.track(TrackKey::Prop(Rc::clone(&name)));
        let (own, proto) = {
            let data = self.raw().borrow();
            match data.as_record() {
                Some(record) => (record.fields.contains_key(&*name), record.proto.clone()),
                None => (false, None),
            }
        };
        if own {
            return true;
        }
        match proto {
            Some(proto) => match self.sibling(&proto) {
                Some(parent) => parent.record_has(name),
                None => proto
                    .borrow()
                    .as_record()
                    .is_some_and(|r| r.fields.contains_key(&*name)),
            },
            None => false,
        }
    }

    /// Remove an own property. Deleting a sequence element leaves `Null`
    /// in its slot. Notifies only if the key existed.
    pub fn delete(&self, key: impl Into<PropKey>) -> bool {
        let key = key.into();
        if self.is_readonly() {
            self.reject_write("delete", &key);
            return true;
        }
        match self.kind() {
            ObjectKind::Record => {
                let name = key.name();
                let removed = self
                    .raw()
                    .borrow_mut()
                    .as_record_mut()
                    .and_then(|record| record.fields.shift_remove(&*name));
                if removed.is_some() {
                    self.notify(TrackKey::Prop(name), ChangeKind::Delete, None);
                }
                true
            }
            ObjectKind::Sequence => match key.seq_slot() {
                Some(SeqSlot::Index(i)) => {
                    let removed = self
                        .raw()
                        .borrow_mut()
                        .as_sequence_mut()
                        .and_then(|items| items.get_mut(i).map(std::mem::take));
                    if removed.is_some() {
                        self.notify(TrackKey::Index(i), ChangeKind::Delete, None);
                    }
                    true
                }
                _ => false,
            },
            ObjectKind::Set | ObjectKind::Map => {
                self.unsupported("delete");
                false
            }
        }
    }

    /// Own keys in order. Tracks key enumeration for records and the length
    /// for sequences.
    pub fn own_keys(&self) -> Vec<PropKey> {
        match self.kind() {
            ObjectKind::Record => {
                self.track(TrackKey::Iterate);
                self.raw()
                    .borrow()
                    .as_record()
                    .map(|record| record.fields.keys().cloned().map(PropKey::Name).collect())
                    .unwrap_or_default()
            }
            ObjectKind::Sequence => {
                self.track(TrackKey::Length);
                (0..self.raw().len()).map(PropKey::Index).collect()
            }
            ObjectKind::Set | ObjectKind::Map => {
                self.unsupported("own_keys");
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
    fn set_notifies_readers_once() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("text", "a")]));
        let s = state.clone();
        let count = runs(&rt, move || {
            let _ = s.get("text");
        });
        state.set("text", "b");
        assert_eq!(count.get(), 2);
        state.set("text", "b");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn nan_writes_are_not_changes() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("n", f64::NAN)]));
        let s = state.clone();
        let count = runs(&rt, move || {
            let _ = s.get("n");
        });
        state.set("n", f64::NAN);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn prototype_reads_track_both_levels() {
        let rt = Runtime::new();
        let parent_raw = ObjectRef::record([("bar", 1)]);
        let child_raw = ObjectRef::record_with_proto(Vec::<(&str, Value)>::new(), &parent_raw);
        let parent = rt.reactive(&parent_raw);
        let child = rt.reactive(&child_raw);

        let c = child.clone();
        let seen = Rc::new(Cell::new(0.0));
        let out = Rc::clone(&seen);
        let count = runs(&rt, move || out.set(c.get("bar").as_f64().unwrap_or_default()));
        assert_eq!(seen.get(), 1.0);

        parent.set("bar", 2);
        assert_eq!(count.get(), 2);
        assert_eq!(seen.get(), 2.0);

        // Writing through the child shadows the parent and notifies once.
        child.set("bar", 3);
        assert_eq!(count.get(), 3);
        assert_eq!(parent_raw.field("bar"), Value::from(2));
        assert_eq!(child_raw.field("bar"), Value::from(3));
    }

    #[test]
    fn has_and_delete() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("a", 1)]));
        let s = state.clone();
        let count = runs(&rt, move || {
            let _ = s.has("a");
        });
        assert!(state.has("a"));
        assert!(state.delete("missing"));
        assert_eq!(count.get(), 1);
        state.delete("a");
        assert_eq!(count.get(), 2);
        assert!(!state.has("a"));
    }

    #[test]
    fn deleting_a_key_invalidates_enumeration_only() {
        let rt = Runtime::new();
        let state = rt.reactive(&ObjectRef::record([("a", 1), ("b", 2)]));
        let (s1, s2) = (state.clone(), state.clone());
        let keys = runs(&rt, move || {
            let _ = s1.own_keys();
        });
        let reader_b = runs(&rt, move || {
            let _ = s2.get("b");
        });
        state.delete("a");
        assert_eq!(keys.get(), 2);
        assert_eq!(reader_b.get(), 1);
        // Updating an existing key does not change the key set.
        state.set("b", 5);
        assert_eq!(keys.get(), 2);
        assert_eq!(reader_b.get(), 2);
    }

    #[test]
    fn readonly_rejects_and_counts() {
        let rt = Runtime::new();
        let raw = ObjectRef::record([("a", 1)]);
        let ro = rt.readonly(&raw);
        assert!(ro.set("a", 2));
        assert!(ro.delete("a"));
        assert_eq!(raw.field("a"), Value::from(1));
        assert_eq!(rt.stats().readonly_violations, 2);
    }

    #[test]
    fn readonly_reads_do_not_track() {
        let rt = Runtime::new();
        let raw = ObjectRef::record([("a", 1)]);
        let ro = rt.readonly(&raw);
        let r = ro.clone();
        let count = runs(&rt, move || {
            let _ = r.get("a");
        });
        rt.reactive(&raw).set("a", 2);
        assert_eq!(count.get(), 1);
        assert_eq!(ro.get("a").as_f64(), Some(2.0));
    }

    #[test]
    fn kind_mismatch_is_neutral() {
        let rt = Runtime::new();
        let set = rt.reactive(&ObjectRef::set([1, 2]));
        assert!(set.get("x").is_null());
        assert!(!set.set("x", 1));
        assert!(set.own_keys().is_empty());
        assert_eq!(set.size(), 2);
    }
}
