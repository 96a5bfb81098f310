#![forbid(unsafe_code)]

//! An in-memory [`Host`] that records every operation.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Removed nodes stay in the
//! arena (detached) so ids are never reused within one host, which keeps
//! "same host node" assertions meaningful across renders.
//!
//! Listener props (`onClick`, ...) are routed through a
//! [`ListenerTable`]; every other prop is stored as a string attribute.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use web_time::Instant;
use weft_core::Clock;
use weft_render::events::event_name;
use weft_render::{Event, Host, ListenerChange, ListenerTable, NodeId, PropValue};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateElement { node: u32, tag: String },
    CreateText { node: u32 },
    CreateComment { node: u32 },
    Insert { node: u32, parent: u32, anchor: Option<u32> },
    SetElementText { el: u32 },
    SetText { node: u32 },
    SetAttr { el: u32, key: String },
    RemoveAttr { el: u32, key: String },
    Listener { el: u32, event: String, change: &'static str },
    Remove { node: u32 },
}

/// Aggregate counts over the recorded operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostCounters {
    pub created: usize,
    pub inserts: usize,
    /// Inserts of a node that already had a parent.
    pub moves: usize,
    pub removes: usize,
    pub props: usize,
    pub text_writes: usize,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text,
    Comment,
}

#[derive(Debug, Clone)]
struct HostNode {
    kind: NodeKind,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct MemoryHost {
    nodes: Vec<HostNode>,
    root: NodeId,
    listeners: ListenerTable,
    ops: Vec<HostOp>,
    counters: HostCounters,
}

impl MemoryHost {
    /// A host with one root container and a wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::real())
    }

    /// A host whose listeners are stamped from `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        let root = HostNode {
            kind: NodeKind::Element {
                tag: "root".to_owned(),
                attrs: BTreeMap::new(),
            },
            text: String::new(),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId::from_raw(0),
            listeners: ListenerTable::new(clock),
            ops: Vec::new(),
            counters: HostCounters::default(),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &HostNode {
        &self.nodes[id.raw() as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut HostNode {
        &mut self.nodes[id.raw() as usize]
    }

    fn alloc(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(HostNode {
            kind,
            text: text.to_owned(),
            parent: None,
            children: Vec::new(),
        });
        self.counters.created += 1;
        id
    }

    fn detach(&mut self, id: NodeId) -> bool {
        match self.node_mut(id).parent.take() {
            Some(parent) => {
                self.node_mut(parent).children.retain(|c| *c != id);
                true
            }
            None => false,
        }
    }

    fn forget_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            self.listeners.forget(node);
            stack.extend(self.node(node).children.iter().copied());
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Whether `id` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.node(node).parent;
        }
        false
    }

    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Text of a text or comment node, or the text content set on an
    /// element.
    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    #[must_use]
    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// Dispatch `event` on `el`, stamped with the host clock's current time.
    pub fn dispatch(&self, el: NodeId, event: &str) -> bool {
        self.dispatch_at(el, event, self.listeners.clock().now())
    }

    /// Dispatch an event carrying an explicit timestamp.
    pub fn dispatch_at(&self, el: NodeId, event: &str, timestamp: Instant) -> bool {
        self.listeners.dispatch(el, &Event::new(event, timestamp))
    }

    #[must_use]
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    #[must_use]
    pub fn counters(&self) -> HostCounters {
        self.counters
    }

    pub fn reset_counters(&mut self) {
        self.counters = HostCounters::default();
    }

    /// The op log as JSON lines.
    pub fn ops_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for op in &self.ops {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&serde_json::to_string(op)?);
        }
        Ok(out)
    }

    /// Markup of the children of `id`.
    #[must_use]
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_inner(id, &mut out);
        out
    }

    fn write_inner(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if node.children.is_empty() {
            if matches!(node.kind, NodeKind::Element { .. }) {
                out.push_str(&node.text);
            }
            return;
        }
        for &child in &node.children {
            self.write_outer(child, out);
        }
    }

    fn write_outer(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attrs {
                    let _ = write!(out, " {key}=\"{value}\"");
                }
                out.push('>');
                self.write_inner(id, out);
                let _ = write!(out, "</{tag}>");
            }
            NodeKind::Text => out.push_str(&node.text),
            NodeKind::Comment => {
                let _ = write!(out, "<!--{}-->", node.text);
            }
        }
    }

    /// Structural snapshot of the subtree under `id`.
    #[must_use]
    pub fn snapshot(&self, id: NodeId) -> serde_json::Value {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Element { tag, attrs } => serde_json::json!({
                "tag": tag,
                "attrs": attrs,
                "text": node.text,
                "children": node
                    .children
                    .iter()
                    .map(|c| self.snapshot(*c))
                    .collect::<Vec<_>>(),
            }),
            NodeKind::Text => serde_json::json!({ "text": node.text }),
            NodeKind::Comment => serde_json::json!({ "comment": node.text }),
        }
    }

    /// Content hash of [`snapshot`](Self::snapshot); equal trees hash equal
    /// regardless of the node ids involved.
    #[must_use]
    pub fn digest(&self, id: NodeId) -> String {
        blake3::hash(self.snapshot(id).to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

fn change_label(change: ListenerChange) -> &'static str {
    match change {
        ListenerChange::Attached => "attached",
        ListenerChange::Swapped => "swapped",
        ListenerChange::Detached => "detached",
        ListenerChange::Unchanged => "unchanged",
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = self.alloc(
            NodeKind::Element {
                tag: tag.to_owned(),
                attrs: BTreeMap::new(),
            },
            "",
        );
        self.ops.push(HostOp::CreateElement {
            node: id.raw(),
            tag: tag.to_owned(),
        });
        id
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text, text);
        self.ops.push(HostOp::CreateText { node: id.raw() });
        id
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Comment, text);
        self.ops.push(HostOp::CreateComment { node: id.raw() });
        id
    }

    fn insert(&mut self, node: NodeId, parent: NodeId, anchor: Option<NodeId>) {
        if self.detach(node) {
            self.counters.moves += 1;
        }
        let siblings = &mut self.node_mut(parent).children;
        let at = anchor
            .and_then(|a| siblings.iter().position(|c| *c == a))
            .unwrap_or(siblings.len());
        siblings.insert(at, node);
        self.node_mut(node).parent = Some(parent);
        self.counters.inserts += 1;
        self.ops.push(HostOp::Insert {
            node: node.raw(),
            parent: parent.raw(),
            anchor: anchor.map(NodeId::raw),
        });
    }

    fn set_element_text(&mut self, el: NodeId, text: &str) {
        for child in std::mem::take(&mut self.node_mut(el).children) {
            self.node_mut(child).parent = None;
        }
        self.node_mut(el).text = text.to_owned();
        self.counters.text_writes += 1;
        self.ops.push(HostOp::SetElementText { el: el.raw() });
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).text = text.to_owned();
        self.counters.text_writes += 1;
        self.ops.push(HostOp::SetText { node: node.raw() });
    }

    fn patch_prop(
        &mut self,
        el: NodeId,
        key: &str,
        _prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) {
        self.counters.props += 1;
        if let Some(event) = event_name(key) {
            let change = self.listeners.patch(el, &event, next);
            self.ops.push(HostOp::Listener {
                el: el.raw(),
                event,
                change: change_label(change),
            });
            return;
        }
        let NodeKind::Element { attrs, .. } = &mut self.node_mut(el).kind else {
            tracing::warn!(%el, key, "prop patched on a non-element node");
            return;
        };
        match next {
            Some(value) => {
                attrs.insert(key.to_owned(), value.to_string());
                self.ops.push(HostOp::SetAttr {
                    el: el.raw(),
                    key: key.to_owned(),
                });
            }
            None => {
                attrs.remove(key);
                self.ops.push(HostOp::RemoveAttr {
                    el: el.raw(),
                    key: key.to_owned(),
                });
            }
        }
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
        self.forget_subtree(node);
        self.counters.removes += 1;
        self.ops.push(HostOp::Remove { node: node.raw() });
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let siblings = &self.node(parent).children;
        let at = siblings.iter().position(|c| *c == node)?;
        siblings.get(at + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_render::{Renderer, VNode};

    #[test]
    fn serialize_includes_sorted_attrs() {
        let mut r = Renderer::new(MemoryHost::new());
        let root = r.host().root();
        r.render(
            Some(
                VNode::element("a")
                    .prop("title", "t")
                    .prop("href", "/x")
                    .text_child("go"),
            ),
            root,
        )
        .unwrap();
        assert_eq!(
            r.host().serialize(root),
            r#"<a href="/x" title="t">go</a>"#
        );
    }

    #[test]
    fn moves_are_counted_separately_from_inserts() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert(a, root, None);
        host.insert(b, root, None);
        host.insert(b, root, Some(a));
        let counters = host.counters();
        assert_eq!((counters.inserts, counters.moves), (3, 1));
        assert_eq!(host.serialize(root), "ba");
        assert_eq!(host.next_sibling(b), Some(a));
        assert_eq!(host.next_sibling(a), None);
    }

    #[test]
    fn removal_detaches_and_forgets_listeners() {
        let mut r = Renderer::new(MemoryHost::new());
        let root = r.host().root();
        r.render(
            Some(VNode::element("div").child(VNode::element("button").on("click", |_| {}))),
            root,
        )
        .unwrap();
        assert_eq!(r.host().listeners().len(), 1);
        let div = r.host().children(root)[0];
        r.render(None, root).unwrap();
        assert!(!r.host().is_attached(div));
        assert!(r.host().listeners().is_empty());
    }

    #[test]
    fn ops_serialize_as_json_lines() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let el = host.create_element("p");
        host.insert(el, root, None);
        let jsonl = host.ops_jsonl().unwrap();
        let lines: Vec<serde_json::Value> = jsonl
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["op"], "create_element");
        assert_eq!(lines[1]["op"], "insert");
        assert_eq!(lines[1]["anchor"], serde_json::Value::Null);
    }

    #[test]
    fn digest_ignores_node_identity() {
        let build = |host: &mut MemoryHost, extra: bool| {
            let root = host.root();
            if extra {
                // Burn an id so the trees differ only in numbering.
                let _ = host.create_text("unused");
            }
            let p = host.create_element("p");
            host.set_element_text(p, "hi");
            host.insert(p, root, None);
            host.digest(root)
        };
        let mut a = MemoryHost::new();
        let mut b = MemoryHost::new();
        assert_eq!(build(&mut a, false), build(&mut b, true));
    }
}
