#![forbid(unsafe_code)]

//! Tree reconciler.
//!
//! [`Renderer::render`] compares the tree last rendered into a container
//! with a new one and applies the difference through the [`Host`].
//!
//! # Dispatch
//!
//! | previous           | next      | action                                   |
//! |--------------------|-----------|------------------------------------------|
//! | none               | element   | create, children, props, insert          |
//! | element (same tag) | element   | prop diff, then children                 |
//! | none / same kind   | text      | create, or update content if changed     |
//! | none / fragment    | fragment  | children go straight into the container  |
//! | different kind     | any       | unmount previous, mount next in its place|
//! | any                | component | [`RenderError::UnsupportedNode`]         |
//!
//! Host operations counted during a pass are reported as [`PatchStats`] and
//! recorded on the `weft.patch` span.

use ahash::AHashMap;
use web_time::Instant;

use crate::error::{RenderError, Result};
use crate::host::Host;
use crate::vnode::{Children, NodeId, NodeKind, VNode};

/// Host operations issued during one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Host nodes created.
    pub created: usize,
    /// Nodes patched in place.
    pub patched: usize,
    /// Nodes moved among their siblings.
    pub moved: usize,
    /// Host nodes removed.
    pub removed: usize,
    /// `patch_prop` calls.
    pub props: usize,
    /// Text content writes.
    pub text_updates: usize,
}

impl PatchStats {
    /// No host-visible change happened.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created == 0
            && self.moved == 0
            && self.removed == 0
            && self.props == 0
            && self.text_updates == 0
    }
}

pub struct Renderer<H> {
    pub(crate) host: H,
    roots: AHashMap<NodeId, VNode>,
    pub(crate) stats: PatchStats,
}

impl<H: Host> Renderer<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            roots: AHashMap::new(),
            stats: PatchStats::default(),
        }
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn into_host(self) -> H {
        self.host
    }

    /// The tree currently rendered into `container`.
    #[must_use]
    pub fn mounted(&self, container: NodeId) -> Option<&VNode> {
        self.roots.get(&container)
    }

    /// Counters accumulated since the last [`render`](Self::render) began.
    #[must_use]
    pub fn stats(&self) -> PatchStats {
        self.stats
    }

    /// Render `vnode` into `container`, diffing against whatever was
    /// rendered there before. `None` unmounts the previous tree.
    ///
    /// The whole tree is checked before any host operation, so an
    /// unsupported node fails the render with the container untouched and
    /// its previous tree still tracked.
    pub fn render(&mut self, vnode: Option<VNode>, container: NodeId) -> Result<PatchStats> {
        let started = Instant::now();
        let span = tracing::debug_span!(
            "weft.patch",
            container = container.raw(),
            created = tracing::field::Empty,
            moved = tracing::field::Empty,
            removed = tracing::field::Empty,
            duration_us = tracing::field::Empty
        );
        let _guard = span.enter();

        self.stats = PatchStats::default();
        match vnode {
            Some(next) => {
                validate(&next)?;
                let prev = self.roots.remove(&container);
                if let Err(err) = self.patch(prev.as_ref(), &next, container, None) {
                    if let Some(prev) = prev {
                        self.roots.insert(container, prev);
                    }
                    return Err(err);
                }
                self.roots.insert(container, next);
            }
            None => {
                if let Some(prev) = self.roots.remove(&container) {
                    self.unmount(&prev);
                }
            }
        }

        span.record("created", self.stats.created);
        span.record("moved", self.stats.moved);
        span.record("removed", self.stats.removed);
        span.record("duration_us", started.elapsed().as_micros() as u64);
        Ok(self.stats)
    }

    /// Reconcile `prev` into `next` inside `container`. New host nodes are
    /// inserted before `anchor` (appended when `None`).
    pub fn patch(
        &mut self,
        prev: Option<&VNode>,
        next: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        check_kind(next)?;
        let mut anchor = anchor;
        let prev = match prev {
            Some(p) if !VNode::same_kind(p, next) => {
                if let Some(last) = p.last_host_node() {
                    anchor = self.host.next_sibling(last);
                }
                self.unmount(p);
                None
            }
            other => other,
        };

        match next.kind() {
            NodeKind::Element(tag) => match prev {
                None => self.mount_element(tag, next, container, anchor),
                Some(prev) => self.patch_element(prev, next),
            },
            NodeKind::Text | NodeKind::Comment => self.patch_leaf(prev, next, container, anchor),
            NodeKind::Fragment => match prev {
                None => {
                    for child in next.child_nodes().as_nodes().unwrap_or_default() {
                        self.patch(None, child, container, anchor)?;
                    }
                    Ok(())
                }
                Some(prev) => {
                    let tail = match prev.last_host_node() {
                        Some(last) => self.host.next_sibling(last),
                        None => anchor,
                    };
                    self.patch_children(prev, next, container, tail)
                }
            },
            NodeKind::Component(_) => check_kind(next),
        }
    }

    /// Remove the host nodes of `vnode`. Fragments own no host node, so
    /// their children are removed one by one.
    pub fn unmount(&mut self, vnode: &VNode) {
        match vnode.kind() {
            NodeKind::Fragment => {
                for child in vnode.child_nodes().as_nodes().unwrap_or_default() {
                    self.unmount(child);
                }
            }
            NodeKind::Component(_) => {}
            _ => {
                if let Some(el) = vnode.el() {
                    self.host.remove(el);
                    self.stats.removed += 1;
                }
            }
        }
    }

    fn mount_element(
        &mut self,
        tag: &str,
        vnode: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let el = self.host.create_element(tag);
        vnode.set_el(Some(el));
        self.stats.created += 1;

        match vnode.child_nodes() {
            Children::Text(text) => {
                self.host.set_element_text(el, text);
                self.stats.text_updates += 1;
            }
            Children::Nodes(children) => {
                for child in children {
                    self.patch(None, child, el, None)?;
                }
            }
            Children::None => {}
        }

        for (key, value) in vnode.props() {
            self.host.patch_prop(el, key, None, Some(value));
            self.stats.props += 1;
        }

        self.host.insert(el, container, anchor);
        Ok(())
    }

    fn patch_element(&mut self, prev: &VNode, next: &VNode) -> Result<()> {
        let el = prev
            .el()
            .ok_or(RenderError::NotMounted { kind: "element" })?;
        next.set_el(Some(el));
        self.stats.patched += 1;

        for (key, value) in next.props() {
            let old = prev.props().get(key);
            if old != Some(value) {
                self.host.patch_prop(el, key, old, Some(value));
                self.stats.props += 1;
            }
        }
        for (key, old) in prev.props() {
            if !next.props().contains_key(key) {
                self.host.patch_prop(el, key, Some(old), None);
                self.stats.props += 1;
            }
        }

        self.patch_children(prev, next, el, None)
    }

    fn patch_leaf(
        &mut self,
        prev: Option<&VNode>,
        next: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        match prev {
            None => {
                let node = if *next.kind() == NodeKind::Comment {
                    self.host.create_comment(next.content())
                } else {
                    self.host.create_text(next.content())
                };
                next.set_el(Some(node));
                self.stats.created += 1;
                self.host.insert(node, container, anchor);
            }
            Some(prev) => {
                let node = prev.el().ok_or(RenderError::NotMounted {
                    kind: next.kind().as_str(),
                })?;
                next.set_el(Some(node));
                self.stats.patched += 1;
                if prev.content() != next.content() {
                    self.host.set_text(node, next.content());
                    self.stats.text_updates += 1;
                }
            }
        }
        Ok(())
    }

    /// Reconcile the children of `prev` into those of `next`, where
    /// `container` is the host node they live in. `anchor` bounds the range
    /// when the children are a fragment's.
    pub(crate) fn patch_children(
        &mut self,
        prev: &VNode,
        next: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        match (prev.child_nodes(), next.child_nodes()) {
            (Children::Text(old), Children::Text(text)) => {
                if old != text {
                    self.host.set_element_text(container, text);
                    self.stats.text_updates += 1;
                }
            }
            (old, Children::Text(text)) => {
                if let Children::Nodes(old) = old {
                    for child in old {
                        self.unmount(child);
                    }
                }
                self.host.set_element_text(container, text);
                self.stats.text_updates += 1;
            }
            (Children::Nodes(old), Children::Nodes(new)) => {
                self.patch_keyed_children(old, new, container, anchor)?;
            }
            (old, Children::Nodes(new)) => {
                if matches!(old, Children::Text(_)) {
                    self.host.set_element_text(container, "");
                    self.stats.text_updates += 1;
                }
                for child in new {
                    self.patch(None, child, container, anchor)?;
                }
            }
            (Children::Nodes(old), Children::None) => {
                for child in old {
                    self.unmount(child);
                }
            }
            (Children::Text(_), Children::None) => {
                self.host.set_element_text(container, "");
                self.stats.text_updates += 1;
            }
            (Children::None, Children::None) => {}
        }
        Ok(())
    }
}

/// Reject node shapes the reconciler cannot mount.
fn check_kind(node: &VNode) -> Result<()> {
    match (node.kind(), node.child_nodes()) {
        (NodeKind::Component(name), _) => Err(RenderError::UnsupportedNode {
            kind: format!("component `{name}`"),
        }),
        (NodeKind::Fragment, Children::Text(_)) => Err(RenderError::UnsupportedNode {
            kind: "fragment with text children".to_owned(),
        }),
        _ => Ok(()),
    }
}

fn validate(node: &VNode) -> Result<()> {
    check_kind(node)?;
    node.child_nodes()
        .as_nodes()
        .unwrap_or_default()
        .iter()
        .try_for_each(validate)
}

impl<H: std::fmt::Debug> std::fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("host", &self.host)
            .field("containers", &self.roots.len())
            .field("stats", &self.stats)
            .finish()
    }
}
