#![forbid(unsafe_code)]

//! Keyed children diff.
//!
//! Two cursors walk each of the old and new child lists from both ends.
//! Each step tries the four cheap matches (start/start, end/end,
//! old-start/new-end, old-end/new-start); when none hits, the remaining old
//! range is searched linearly for new-start's key. Old entries consumed by
//! that search are cleared so the cursors skip them.
//!
//! # Invariants
//!
//! 1. Every old child whose key appears in the new list keeps its host
//!    node; every other old child is unmounted exactly once.
//! 2. After the diff the host children of the range are in new-list order.
//! 3. Host nodes after the range (the `anchor` and beyond) are untouched.
//!
//! # Failure modes
//!
//! - Unkeyed children compare equal to each other, so they pair up by
//!   position. Mixing keyed and unkeyed siblings disables most moves and
//!   falls back to remounting.
//! - The fallback search is linear, so a full shuffle costs O(n·m).

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::Result;
use crate::host::Host;
use crate::renderer::Renderer;
use crate::vnode::{NodeId, VNode};

impl<H: Host> Renderer<H> {
    pub(crate) fn patch_keyed_children(
        &mut self,
        old: &[VNode],
        new: &[VNode],
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        if old.iter().chain(new).any(|n| n.key_ref().is_none()) {
            debug!(
                old = old.len(),
                new = new.len(),
                "keyed diff over unkeyed children; matching by position"
            );
        }

        let mut slots: SmallVec<[Option<&VNode>; 16]> = old.iter().map(Some).collect();
        let (mut os, mut oe) = (0, old.len());
        let (mut ns, mut ne) = (0, new.len());

        while os < oe && ns < ne {
            let (Some(old_start), Some(old_end)) = (slots[os], slots[oe - 1]) else {
                if slots[os].is_none() {
                    os += 1;
                } else {
                    oe -= 1;
                }
                continue;
            };
            let new_start = &new[ns];
            let new_end = &new[ne - 1];

            if VNode::same_key(old_start, new_start) {
                // Anchors only matter if the old node owns no host node yet.
                let place = range_anchor(&slots[os + 1..oe], new, ne, anchor);
                self.patch(Some(old_start), new_start, container, place)?;
                os += 1;
                ns += 1;
            } else if VNode::same_key(old_end, new_end) {
                let place = tail_anchor(new, ne, anchor);
                self.patch(Some(old_end), new_end, container, place)?;
                oe -= 1;
                ne -= 1;
            } else if VNode::same_key(old_start, new_end) {
                // Front to back: lands just after the current old end.
                self.patch(Some(old_start), new_end, container, None)?;
                let after = match old_end.last_host_node() {
                    Some(last) => self.host.next_sibling(last),
                    None => tail_anchor(new, ne, anchor),
                };
                self.move_before(new_end, container, after);
                os += 1;
                ne -= 1;
            } else if VNode::same_key(old_end, new_start) {
                // Back to front: lands just before the current old start.
                self.patch(Some(old_end), new_start, container, None)?;
                let before = range_anchor(&slots[os..oe - 1], new, ne, anchor);
                self.move_before(new_start, container, before);
                oe -= 1;
                ns += 1;
            } else {
                let before = range_anchor(&slots[os..oe], new, ne, anchor);
                let found = (os + 1..oe)
                    .find(|&i| slots[i].is_some_and(|o| VNode::same_key(o, new_start)));
                match found.and_then(|i| slots[i].take()) {
                    Some(matched) => {
                        self.patch(Some(matched), new_start, container, None)?;
                        self.move_before(new_start, container, before);
                    }
                    None => self.patch(None, new_start, container, before)?,
                }
                ns += 1;
            }
        }

        if os >= oe {
            let before = tail_anchor(new, ne, anchor);
            for node in &new[ns..ne] {
                self.patch(None, node, container, before)?;
            }
        } else if ns >= ne {
            for old_node in slots[os..oe].iter().flatten() {
                self.unmount(old_node);
            }
        }
        Ok(())
    }

    fn move_before(&mut self, vnode: &VNode, container: NodeId, anchor: Option<NodeId>) {
        let nodes = vnode.host_nodes();
        // Nothing precedes it in the range, so it is already in place.
        if nodes.is_empty() || anchor.is_some_and(|a| nodes.contains(&a)) {
            return;
        }
        for &node in &nodes {
            self.host.insert(node, container, anchor);
        }
        self.stats.moved += 1;
        trace!(key = ?vnode.key_ref(), nodes = nodes.len(), ?anchor, "moved");
    }
}

/// First host node after the unprocessed new range.
fn tail_anchor(new: &[VNode], ne: usize, anchor: Option<NodeId>) -> Option<NodeId> {
    new[ne..]
        .iter()
        .find_map(VNode::first_host_node)
        .or(anchor)
}

/// First host node of the unprocessed old range, skipping consumed slots
/// and empty fragments.
fn range_anchor(
    slots: &[Option<&VNode>],
    new: &[VNode],
    ne: usize,
    anchor: Option<NodeId>,
) -> Option<NodeId> {
    slots
        .iter()
        .flatten()
        .find_map(|n| n.first_host_node())
        .or_else(|| tail_anchor(new, ne, anchor))
}
