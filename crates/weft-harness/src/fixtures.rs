//! Reference trees.

use weft_render::{NodeId, VNode};

use crate::MemoryHost;

/// `<ul>` with one `<li key=k>k</li>` per key.
#[must_use]
pub fn keyed_list(keys: &[u32]) -> VNode {
    VNode::element("ul").children(keys.iter().map(|&k| keyed_item(k)))
}

#[must_use]
pub fn keyed_item(key: u32) -> VNode {
    VNode::element("li").key(key).text_child(key.to_string())
}

/// Same as [`keyed_list`], but every third entry is a keyed fragment of two
/// text nodes, so moves have to carry multi-node ranges.
#[must_use]
pub fn mixed_list(keys: &[u32]) -> VNode {
    VNode::element("ul").children(keys.iter().map(|&k| {
        if k % 3 == 0 {
            VNode::fragment([VNode::text(format!("{k}")).key("a"), VNode::text("|").key("b")])
                .key(k)
        } else {
            keyed_item(k)
        }
    }))
}

/// Text content of each child of `parent`, in host order.
#[must_use]
pub fn child_texts(host: &MemoryHost, parent: NodeId) -> Vec<String> {
    host.children(parent)
        .iter()
        .map(|&c| match host.tag(c) {
            Some(_) => host.serialize(c),
            None => host.text(c).to_owned(),
        })
        .collect()
}
