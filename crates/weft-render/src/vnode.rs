#![forbid(unsafe_code)]

//! Virtual nodes: one immutable description of a desired host node per
//! render pass.
//!
//! A [`VNode`] carries a non-owning back-reference to the host node it was
//! realized as. The reconciler fills it in on mount and copies it forward
//! when the node is patched in place.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::events::{Event, Handler, Handlers};

/// Opaque handle to a host node, allocated by the [`Host`](crate::Host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node kind discriminant. Two nodes of different kinds (or elements with
/// different tags) are never patched into each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Rc<str>),
    Text,
    Comment,
    Fragment,
    Component(Rc<str>),
}

impl NodeKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Text => "text",
            Self::Comment => "comment",
            Self::Fragment => "fragment",
            Self::Component(_) => "component",
        }
    }
}

/// Sibling identity used by the keyed diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

/// A prop value: attribute, DOM-style property, or listener list.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Handlers(Handlers),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Handlers(h) => write!(f, "<{} handler(s)>", h.len()),
        }
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for PropValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Handlers> for PropValue {
    fn from(h: Handlers) -> Self {
        Self::Handlers(h)
    }
}

impl From<Handler> for PropValue {
    fn from(h: Handler) -> Self {
        Self::Handlers(h.into())
    }
}

pub type Props = IndexMap<Rc<str>, PropValue>;

#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    None,
    Text(Rc<str>),
    Nodes(Vec<VNode>),
}

impl Children {
    #[must_use]
    pub fn as_nodes(&self) -> Option<&[VNode]> {
        match self {
            Self::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct VNode {
    kind: NodeKind,
    key: Option<Key>,
    props: Props,
    children: Children,
    el: Cell<Option<NodeId>>,
}

impl VNode {
    fn new(kind: NodeKind, children: Children) -> Self {
        Self {
            kind,
            key: None,
            props: Props::new(),
            children,
            el: Cell::new(None),
        }
    }

    #[must_use]
    pub fn element(tag: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Element(tag.into()), Children::None)
    }

    #[must_use]
    pub fn text(content: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Text, Children::Text(content.into()))
    }

    #[must_use]
    pub fn comment(content: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Comment, Children::Text(content.into()))
    }

    #[must_use]
    pub fn fragment(children: impl IntoIterator<Item = VNode>) -> Self {
        Self::new(NodeKind::Fragment, Children::Nodes(children.into_iter().collect()))
    }

    /// A component placeholder. The reconciler rejects these; composition is
    /// left to the layer above.
    #[must_use]
    pub fn component(name: impl Into<Rc<str>>) -> Self {
        Self::new(NodeKind::Component(name.into()), Children::None)
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn prop(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Attach a listener: `.on("click", f)` sets the `onClick` prop.
    #[must_use]
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        let mut chars = event.chars();
        let name = match chars.next() {
            Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "on".to_owned(),
        };
        self.prop(name, Handlers::single(handler))
    }

    #[must_use]
    pub fn text_child(mut self, content: impl Into<Rc<str>>) -> Self {
        self.children = Children::Text(content.into());
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children = Children::Nodes(children.into_iter().collect());
        self
    }

    #[must_use]
    pub fn child(mut self, child: VNode) -> Self {
        match &mut self.children {
            Children::Nodes(nodes) => nodes.push(child),
            other => *other = Children::Nodes(vec![child]),
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[must_use]
    pub fn key_ref(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }

    #[must_use]
    pub fn child_nodes(&self) -> &Children {
        &self.children
    }

    /// Host node this vnode was realized as. Always `None` for fragments.
    #[must_use]
    pub fn el(&self) -> Option<NodeId> {
        self.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<NodeId>) {
        self.el.set(el);
    }

    /// Text of a text or comment node.
    #[must_use]
    pub fn content(&self) -> &str {
        self.children.as_text().unwrap_or_default()
    }

    #[must_use]
    pub fn same_kind(a: &Self, b: &Self) -> bool {
        a.kind == b.kind
    }

    /// Keys match, with two unkeyed nodes counting as a match.
    #[must_use]
    pub fn same_key(a: &Self, b: &Self) -> bool {
        a.key == b.key
    }

    /// Host nodes this vnode occupies, in sibling order. Fragments
    /// contribute their children's nodes.
    pub(crate) fn host_nodes(&self) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        self.collect_host_nodes(&mut out);
        out
    }

    fn collect_host_nodes(&self, out: &mut SmallVec<[NodeId; 4]>) {
        match (&self.kind, &self.children) {
            (NodeKind::Fragment, Children::Nodes(children)) => {
                for child in children {
                    child.collect_host_nodes(out);
                }
            }
            (NodeKind::Fragment, _) => {}
            _ => out.extend(self.el.get()),
        }
    }

    pub(crate) fn first_host_node(&self) -> Option<NodeId> {
        match (&self.kind, &self.children) {
            (NodeKind::Fragment, Children::Nodes(children)) => {
                children.iter().find_map(Self::first_host_node)
            }
            (NodeKind::Fragment, _) => None,
            _ => self.el.get(),
        }
    }

    pub(crate) fn last_host_node(&self) -> Option<NodeId> {
        match (&self.kind, &self.children) {
            (NodeKind::Fragment, Children::Nodes(children)) => {
                children.iter().rev().find_map(Self::last_host_node)
            }
            (NodeKind::Fragment, _) => None,
            _ => self.el.get(),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("kind", &self.kind);
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if !self.props.is_empty() {
            s.field("props", &self.props);
        }
        s.field("children", &self.children)
            .field("el", &self.el.get())
            .finish()
    }
}
