#![forbid(unsafe_code)]

//! Sequence methods.
//!
//! The mutators run with tracking paused and are written in terms of the
//! wrapper's own primitive reads and writes, so each moved slot notifies
//! its readers. Pausing keeps an effect that pushes from subscribing to the
//! length it reads while doing so.

use super::{Observed, Reactive};
use crate::store::{ChangeKind, TrackKey};
use crate::value::{ObjectKind, Value};

/// Strict equality: like same-value-zero, except `NaN` matches nothing.
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        _ => a.same(b),
    }
}

impl Reactive {
    fn expect_sequence(&self, op: &'static str) -> bool {
        if self.kind() == ObjectKind::Sequence {
            true
        } else {
            self.unsupported(op);
            false
        }
    }

    /// Number of elements. Tracks the length.
    pub fn len(&self) -> usize {
        if !self.expect_sequence("len") {
            return 0;
        }
        self.track(TrackKey::Length);
        self.raw().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate or pad (with `Null`) to `len`. Readers of the length and of
    /// every dropped index are notified.
    ///
    /// Returns `false`, leaving the sequence alone, when `len` exceeds
    /// `RuntimeConfig::max_sequence_len`. A read-only wrapper refuses the
    /// write but reports success.
    pub fn set_len(&self, len: usize) -> bool {
        if !self.expect_sequence("set_len") {
            return false;
        }
        if self.is_readonly() {
            self.reject_write("set_len", &"length");
            return true;
        }
        if !self.fits_length("set_len", len) {
            return false;
        }
        let changed = {
            let mut data = self.raw().borrow_mut();
            match data.as_sequence_mut() {
                Some(items) if items.len() != len => {
                    items.resize(len, Value::Null);
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.notify(TrackKey::Length, ChangeKind::Set, Some(len));
        }
        true
    }

    /// Write element `index`, padding with `Null` when it is past the end.
    /// Returns `false` when that would exceed the length limit.
    pub(crate) fn index_set(&self, index: usize, value: Value) -> bool {
        if index >= self.raw().len() && !self.fits_length("set", index.saturating_add(1)) {
            return false;
        }
        let change = {
            let mut data = self.raw().borrow_mut();
            let Some(items) = data.as_sequence_mut() else {
                return false;
            };
            if let Some(slot) = items.get_mut(index) {
                if slot.same(&value) {
                    None
                } else {
                    *slot = value;
                    Some(ChangeKind::Set)
                }
            } else {
                items.resize(index, Value::Null);
                items.push(value);
                Some(ChangeKind::Add)
            }
        };
        if let Some(change) = change {
            self.notify(TrackKey::Index(index), change, None);
        }
        true
    }

    /// Every element, in order. Tracks the length and each index.
    pub fn items(&self) -> Vec<Observed> {
        let len = self.len();
        (0..len).map(|i| self.index_get(i)).collect()
    }

    /// Append one element; returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.extend([value.into()])
    }

    /// Append elements in order; returns the new length.
    pub fn extend(&self, values: impl IntoIterator<Item = Value>) -> usize {
        if !self.expect_sequence("push") {
            return 0;
        }
        if self.is_readonly() {
            self.reject_write("push", &"length");
            return self.raw().len();
        }
        let values: Vec<Value> = values.into_iter().collect();
        let _pause = self.pause_tracking();
        let mut len = self.len();
        if !self.fits_length("push", len.saturating_add(values.len())) {
            return len;
        }
        for value in values {
            self.index_set(len, value);
            len += 1;
        }
        len
    }

    /// Remove and return the last element (`Null` when empty).
    pub fn pop(&self) -> Observed {
        if !self.expect_sequence("pop") {
            return Observed::NULL;
        }
        if self.is_readonly() {
            self.reject_write("pop", &"length");
            return Observed::NULL;
        }
        let _pause = self.pause_tracking();
        let len = self.len();
        if len == 0 {
            return Observed::NULL;
        }
        let last = self.index_get(len - 1);
        self.delete(len - 1);
        self.set_len(len - 1);
        last
    }

    /// Remove and return the first element (`Null` when empty).
    pub fn shift(&self) -> Observed {
        if !self.expect_sequence("shift") {
            return Observed::NULL;
        }
        if self.is_readonly() {
            self.reject_write("shift", &0);
            return Observed::NULL;
        }
        let _pause = self.pause_tracking();
        let len = self.len();
        if len == 0 {
            return Observed::NULL;
        }
        let first = self.index_get(0);
        for k in 1..len {
            let moved = self.index_get(k).into_value();
            self.index_set(k - 1, moved);
        }
        self.delete(len - 1);
        self.set_len(len - 1);
        first
    }

    /// Insert elements at the front; returns the new length.
    pub fn unshift(&self, values: impl IntoIterator<Item = Value>) -> usize {
        if !self.expect_sequence("unshift") {
            return 0;
        }
        if self.is_readonly() {
            self.reject_write("unshift", &0);
            return self.raw().len();
        }
        let values: Vec<Value> = values.into_iter().collect();
        let _pause = self.pause_tracking();
        let len = self.len();
        let count = values.len();
        if !self.fits_length("unshift", len.saturating_add(count)) {
            return len;
        }
        if count > 0 {
            for k in (0..len).rev() {
                let moved = self.index_get(k).into_value();
                self.index_set(k + count, moved);
            }
            for (j, value) in values.into_iter().enumerate() {
                self.index_set(j, value);
            }
        }
        self.set_len(len + count);
        len + count
    }

    /// Remove `delete_count` elements at `start`, insert `values` there, and
    /// return the removed elements (raw). `start` and `delete_count` are
    /// clamped to the sequence.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        values: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        if !self.expect_sequence("splice") {
            return Vec::new();
        }
        if self.is_readonly() {
            self.reject_write("splice", &start);
            return Vec::new();
        }
        let values: Vec<Value> = values.into_iter().collect();
        let _pause = self.pause_tracking();
        let len = self.len();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        let insert_count = values.len();
        if !self.fits_length("splice", (len - delete_count).saturating_add(insert_count)) {
            return Vec::new();
        }

        let removed: Vec<Value> = (start..start + delete_count)
            .map(|i| self.index_get(i).into_value())
            .collect();

        if insert_count < delete_count {
            for k in start..(len - delete_count) {
                let moved = self.index_get(k + delete_count).into_value();
                self.index_set(k + insert_count, moved);
            }
            for k in ((len - delete_count + insert_count)..len).rev() {
                self.delete(k);
            }
        } else if insert_count > delete_count {
            for k in (start..(len - delete_count)).rev() {
                let moved = self.index_get(k + delete_count).into_value();
                self.index_set(k + insert_count, moved);
            }
        }
        for (j, value) in values.into_iter().enumerate() {
            self.index_set(start + j, value);
        }
        self.set_len(len - delete_count + insert_count);
        removed
    }

    /// Whether `needle` is an element. The wrapped view is searched first,
    /// then the raw source, so both wrapped and raw needles are found.
    pub fn includes(&self, needle: impl Into<Observed>) -> bool {
        let needle = needle.into();
        if !self.expect_sequence("includes") {
            return false;
        }
        if self.items().iter().any(|item| *item == needle) {
            return true;
        }
        let raw = needle.into_value();
        self.raw()
            .borrow()
            .as_sequence()
            .is_some_and(|items| items.iter().any(|item| item.same(&raw)))
    }

    /// First index of `needle` (strict equality: `NaN` is never found).
    pub fn index_of(&self, needle: impl Into<Observed>) -> Option<usize> {
        self.search(needle.into(), "index_of", false)
    }

    /// Last index of `needle` (strict equality).
    pub fn last_index_of(&self, needle: impl Into<Observed>) -> Option<usize> {
        self.search(needle.into(), "last_index_of", true)
    }

    fn search(&self, needle: Observed, op: &'static str, from_end: bool) -> Option<usize> {
        if !self.expect_sequence(op) {
            return None;
        }
        let matches = |item: &Observed| match (item, &needle) {
            (Observed::Value(a), Observed::Value(b)) => strict_eq(a, b),
            _ => item == &needle,
        };
        let view = self.items();
        let found = if from_end {
            view.iter().rposition(matches)
        } else {
            view.iter().position(matches)
        };
        if found.is_some() {
            return found;
        }
        let raw = needle.into_value();
        let data = self.raw().borrow();
        let items = data.as_sequence()?;
        if from_end {
            items.iter().rposition(|item| strict_eq(item, &raw))
        } else {
            items.iter().position(|item| strict_eq(item, &raw))
        }
    }
}
