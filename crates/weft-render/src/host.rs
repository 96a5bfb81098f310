//! The operation set a host platform supplies to the reconciler.

use crate::vnode::{NodeId, PropValue};

/// Host node operations. One method per capability; the reconciler never
/// inspects host nodes beyond the [`NodeId`] handles returned here.
pub trait Host {
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    fn create_comment(&mut self, text: &str) -> NodeId;

    /// Insert `node` into `parent` before `anchor`, or at the end when
    /// `anchor` is `None`. Inserting a node that is already attached moves
    /// it.
    fn insert(&mut self, node: NodeId, parent: NodeId, anchor: Option<NodeId>);

    /// Replace all children of `el` with a single text content.
    fn set_element_text(&mut self, el: NodeId, text: &str);

    /// Update the content of a text or comment node.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Apply one prop change. `next == None` clears the prop.
    fn patch_prop(
        &mut self,
        el: NodeId,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    );

    /// Detach `node` from its parent.
    fn remove(&mut self, node: NodeId);

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn create_element(&mut self, tag: &str) -> NodeId {
        (**self).create_element(tag)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        (**self).create_text(text)
    }

    fn create_comment(&mut self, text: &str) -> NodeId {
        (**self).create_comment(text)
    }

    fn insert(&mut self, node: NodeId, parent: NodeId, anchor: Option<NodeId>) {
        (**self).insert(node, parent, anchor);
    }

    fn set_element_text(&mut self, el: NodeId, text: &str) {
        (**self).set_element_text(el, text);
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        (**self).set_text(node, text);
    }

    fn patch_prop(
        &mut self,
        el: NodeId,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) {
        (**self).patch_prop(el, key, prev, next);
    }

    fn remove(&mut self, node: NodeId) {
        (**self).remove(node);
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        (**self).next_sibling(node)
    }
}
