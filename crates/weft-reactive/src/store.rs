#![forbid(unsafe_code)]

//! Dependency store: `(target, key) → {effect}`.
//!
//! The store grows on [`subscribe`](DependencyStore::subscribe) and shrinks
//! only when an effect's previous subscriptions are dropped before it re-runs
//! (or when the effect is stopped). Entries whose subscriber set empties stay
//! in place until the runtime is disposed.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexSet;

use crate::effect::EffectId;
use crate::value::{ObjectId, ObjectKind, Value};

/// The key half of a dependency entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// Named record property.
    Prop(Rc<str>),
    /// Sequence element.
    Index(usize),
    /// Sequence length.
    Length,
    /// Set member or map key.
    Entry(Value),
    /// "Any key added or removed" (enumeration, size, value iteration).
    Iterate,
    /// "Any map key added or removed" (key-only iteration).
    MapKeyIterate,
    /// The value of a derived computation.
    DerivedValue,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prop(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
            Self::Length => f.write_str("length"),
            Self::Entry(v) => write!(f, "entry({v})"),
            Self::Iterate => f.write_str("<iterate>"),
            Self::MapKeyIterate => f.write_str("<map-key-iterate>"),
            Self::DerivedValue => f.write_str("<derived>"),
        }
    }
}

/// What kind of target a notification concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Record,
    Sequence,
    Set,
    Map,
    Derived,
}

impl From<ObjectKind> for TargetKind {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Record => Self::Record,
            ObjectKind::Sequence => Self::Sequence,
            ObjectKind::Set => Self::Set,
            ObjectKind::Map => Self::Map,
        }
    }
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A key that did not exist now does.
    Add,
    /// An existing key holds a different value.
    Set,
    /// An existing key was removed.
    Delete,
    /// Every entry of a collection was removed.
    Clear,
}

impl ChangeKind {
    /// Whether key membership changed.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Add | Self::Delete)
    }
}

type Subscribers = IndexSet<EffectId>;

/// Registry of subscriptions, owned by one runtime.
#[derive(Debug, Default)]
pub struct DependencyStore {
    targets: AHashMap<ObjectId, AHashMap<TrackKey, Subscribers>>,
}

impl DependencyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `effect` to `(target, key)`. Returns `true` if it was not
    /// already subscribed.
    pub fn subscribe(&mut self, target: ObjectId, key: TrackKey, effect: EffectId) -> bool {
        self.targets
            .entry(target)
            .or_default()
            .entry(key)
            .or_default()
            .insert(effect)
    }

    /// Remove one subscription. Returns `true` if it existed.
    pub fn unsubscribe(&mut self, target: ObjectId, key: &TrackKey, effect: EffectId) -> bool {
        self.targets
            .get_mut(&target)
            .and_then(|keys| keys.get_mut(key))
            .is_some_and(|subs| subs.shift_remove(&effect))
    }

    /// Subscribers of `(target, key)`.
    pub fn subscribers(&self, target: ObjectId, key: &TrackKey) -> impl Iterator<Item = EffectId> + '_ {
        self.targets
            .get(&target)
            .and_then(|keys| keys.get(key))
            .into_iter()
            .flat_map(|subs| subs.iter().copied())
    }

    /// Every `(key, subscribers)` entry of one target.
    pub fn entries(&self, target: ObjectId) -> impl Iterator<Item = (&TrackKey, &IndexSet<EffectId>)> + '_ {
        self.targets
            .get(&target)
            .into_iter()
            .flat_map(|keys| keys.iter())
    }

    /// Whether `effect` is subscribed to `(target, key)`.
    #[must_use]
    pub fn is_subscribed(&self, target: ObjectId, key: &TrackKey, effect: EffectId) -> bool {
        self.targets
            .get(&target)
            .and_then(|keys| keys.get(key))
            .is_some_and(|subs| subs.contains(&effect))
    }

    /// Number of targets with at least one entry (live or emptied).
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of `(target, key)` entries (live or emptied).
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.targets.values().map(|m| m.len()).sum()
    }

    /// Total number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.targets
            .values()
            .flat_map(|m| m.values())
            .map(IndexSet::len)
            .sum()
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ObjectId, EffectId, EffectId) {
        (ObjectId::next(), EffectId::next(), EffectId::next())
    }

    #[test]
    fn subscribe_is_idempotent() {
        let (target, e1, _) = ids();
        let mut store = DependencyStore::new();
        assert!(store.subscribe(target, TrackKey::Length, e1));
        assert!(!store.subscribe(target, TrackKey::Length, e1));
        assert_eq!(store.subscription_count(), 1);
    }

    #[test]
    fn unsubscribe_keeps_the_emptied_entry() {
        let (target, e1, _) = ids();
        let mut store = DependencyStore::new();
        store.subscribe(target, TrackKey::Prop("x".into()), e1);
        assert!(store.unsubscribe(target, &TrackKey::Prop("x".into()), e1));
        assert!(!store.unsubscribe(target, &TrackKey::Prop("x".into()), e1));
        assert_eq!(store.subscription_count(), 0);
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn subscribers_are_per_key() {
        let (target, e1, e2) = ids();
        let mut store = DependencyStore::new();
        store.subscribe(target, TrackKey::Index(0), e1);
        store.subscribe(target, TrackKey::Index(1), e2);
        let at0: Vec<_> = store.subscribers(target, &TrackKey::Index(0)).collect();
        assert_eq!(at0, vec![e1]);
        assert!(store.is_subscribed(target, &TrackKey::Index(1), e2));
        assert_eq!(store.entries(target).count(), 2);
        assert_eq!(store.subscribers(ObjectId::next(), &TrackKey::Length).count(), 0);
    }

    #[test]
    fn entry_keys_use_value_equality() {
        let (target, e1, _) = ids();
        let mut store = DependencyStore::new();
        store.subscribe(target, TrackKey::Entry(Value::from(f64::NAN)), e1);
        assert!(store.is_subscribed(target, &TrackKey::Entry(Value::from(f64::NAN)), e1));
    }
}
