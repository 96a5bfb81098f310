#![forbid(unsafe_code)]

//! Hierarchical delta debugging over trees.
//!
//! Given a tree on which some failure reproduces, repeatedly drop children
//! while the failure still reproduces, then descend into what is left. The
//! result is a tree where removing any single remaining child would make the
//! failure disappear.
//!
//! Each level runs ddmin: try dropping halves, then quarters and so on, and
//! also try keeping a single chunk alone. Any accepted reduction restarts
//! that level at halves.
//!
//! ```
//! use weft_harness::shrink::shrink;
//! use weft_render::{NodeKind, VNode};
//!
//! fn has_component(node: &VNode) -> bool {
//!     matches!(node.kind(), NodeKind::Component(_))
//!         || node.child_nodes().as_nodes().unwrap_or_default().iter().any(has_component)
//! }
//!
//! let tree = VNode::element("div").children([
//!     VNode::text("a"),
//!     VNode::element("p").children([VNode::text("b"), VNode::component("Bad")]),
//!     VNode::text("c"),
//! ]);
//! let minimal = shrink(tree, has_component);
//! let kids = minimal.child_nodes().as_nodes().unwrap();
//! assert_eq!(kids.len(), 1);
//! assert_eq!(kids[0].child_nodes().as_nodes().unwrap().len(), 1);
//! ```

use serde::Serialize;
use weft_render::{Children, VNode};

/// A tree whose children can be enumerated and replaced.
pub trait Decomposable: Clone {
    fn children(&self) -> Vec<Self>;

    fn replace_children(&mut self, children: Vec<Self>);
}

impl Decomposable for VNode {
    fn children(&self) -> Vec<Self> {
        self.child_nodes()
            .as_nodes()
            .map(<[VNode]>::to_vec)
            .unwrap_or_default()
    }

    fn replace_children(&mut self, children: Vec<Self>) {
        if matches!(self.child_nodes(), Children::Nodes(_)) {
            *self = self.clone().children(children);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkPhase {
    /// A chunk of children was dropped.
    DropChunk,
    /// Only one chunk of children was kept.
    KeepChunk,
    /// A child was replaced by its own shrunk form.
    Descend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShrinkStep {
    pub step: usize,
    pub phase: ShrinkPhase,
    /// Nodes below the level being reduced, before the attempt.
    pub before: usize,
    /// Nodes after the attempt (equal to `before` when rejected).
    pub after: usize,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
pub struct ShrinkReport<T> {
    pub minimized: T,
    pub steps: Vec<ShrinkStep>,
    pub predicate_calls: usize,
}

impl<T> ShrinkReport<T> {
    /// The reduction log as JSON lines.
    pub fn steps_jsonl(&self) -> serde_json::Result<String> {
        let lines = self
            .steps
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }
}

/// Shrink `input` while `still_fails` holds.
///
/// # Panics
///
/// Panics if `still_fails` does not hold on `input`.
pub fn shrink<T, F>(input: T, still_fails: F) -> T
where
    T: Decomposable,
    F: Fn(&T) -> bool,
{
    let mut shrinker = Shrinker::new(&still_fails, false);
    shrinker.run(input)
}

/// [`shrink`], recording every attempted reduction.
///
/// # Panics
///
/// Panics if `still_fails` does not hold on `input`.
pub fn shrink_logged<T, F>(input: T, still_fails: F) -> ShrinkReport<T>
where
    T: Decomposable,
    F: Fn(&T) -> bool,
{
    let mut shrinker = Shrinker::new(&still_fails, true);
    let minimized = shrinker.run(input);
    ShrinkReport {
        minimized,
        steps: shrinker.steps,
        predicate_calls: shrinker.calls,
    }
}

fn subtree_size<T: Decomposable>(node: &T) -> usize {
    node.children()
        .iter()
        .map(|c| 1 + subtree_size(c))
        .sum()
}

struct Shrinker<'a, F> {
    still_fails: &'a F,
    logging: bool,
    steps: Vec<ShrinkStep>,
    calls: usize,
}

impl<'a, F> Shrinker<'a, F> {
    fn new(still_fails: &'a F, logging: bool) -> Self {
        Self {
            still_fails,
            logging,
            steps: Vec::new(),
            calls: 0,
        }
    }

    fn check<T>(&mut self, candidate: &T) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.calls += 1;
        (self.still_fails)(candidate)
    }

    fn record(&mut self, phase: ShrinkPhase, before: usize, after: usize, accepted: bool) {
        if !self.logging {
            return;
        }
        self.steps.push(ShrinkStep {
            step: self.steps.len(),
            phase,
            before,
            after: if accepted { after } else { before },
            accepted,
        });
    }

    fn run<T>(&mut self, input: T) -> T
    where
        T: Decomposable,
        F: Fn(&T) -> bool,
    {
        assert!(self.check(&input), "failure must reproduce on the input");
        self.level(input)
    }

    fn level<T>(&mut self, input: T) -> T
    where
        T: Decomposable,
        F: Fn(&T) -> bool,
    {
        let mut input = self.ddmin(input);

        let mut children = input.children();
        for i in 0..children.len() {
            let before = subtree_size(&children[i]);
            let shrunk = self.level(children[i].clone());
            let after = subtree_size(&shrunk);

            let original = std::mem::replace(&mut children[i], shrunk);
            let mut candidate = input.clone();
            candidate.replace_children(children.clone());
            let accepted = self.check(&candidate);
            self.record(ShrinkPhase::Descend, before, after, accepted);
            if accepted {
                input = candidate;
            } else {
                children[i] = original;
            }
        }
        input
    }

    fn ddmin<T>(&mut self, mut input: T) -> T
    where
        T: Decomposable,
        F: Fn(&T) -> bool,
    {
        let mut granularity = 2usize;
        loop {
            let children = input.children();
            let len = children.len();
            if len == 0 {
                return input;
            }
            let chunk = len.div_ceil(granularity);
            let chunks: Vec<(usize, usize)> = (0..len)
                .step_by(chunk)
                .map(|start| (start, (start + chunk).min(len)))
                .collect();

            let mut reduced = None;
            for &(start, end) in &chunks {
                let remaining: Vec<T> = children[..start]
                    .iter()
                    .chain(&children[end..])
                    .cloned()
                    .collect();
                let mut candidate = input.clone();
                candidate.replace_children(remaining);
                let accepted = self.check(&candidate);
                self.record(ShrinkPhase::DropChunk, len, len - (end - start), accepted);
                if accepted {
                    reduced = Some(candidate);
                    break;
                }
            }

            if reduced.is_none() && chunks.len() > 1 {
                for &(start, end) in &chunks {
                    let mut candidate = input.clone();
                    candidate.replace_children(children[start..end].to_vec());
                    let accepted = self.check(&candidate);
                    self.record(ShrinkPhase::KeepChunk, len, end - start, accepted);
                    if accepted {
                        reduced = Some(candidate);
                        break;
                    }
                }
            }

            match reduced {
                Some(candidate) => {
                    input = candidate;
                    granularity = 2;
                }
                None if granularity >= len => return input,
                None => granularity = (granularity * 2).min(len),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tree {
        label: u32,
        children: Vec<Tree>,
    }

    impl Decomposable for Tree {
        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }

        fn replace_children(&mut self, children: Vec<Self>) {
            self.children = children;
        }
    }

    fn leaf(label: u32) -> Tree {
        Tree {
            label,
            children: Vec::new(),
        }
    }

    fn contains(t: &Tree, label: u32) -> bool {
        t.label == label || t.children.iter().any(|c| contains(c, label))
    }

    #[test]
    fn isolates_a_single_culprit() {
        let tree = Tree {
            label: 0,
            children: (1..=16).map(leaf).collect(),
        };
        let minimal = shrink(tree, |t| contains(t, 11));
        assert_eq!(minimal.children, vec![leaf(11)]);
    }

    #[test]
    fn keeps_both_halves_of_an_interaction() {
        let tree = Tree {
            label: 0,
            children: (1..=8).map(leaf).collect(),
        };
        let minimal = shrink(tree, |t| contains(t, 2) && contains(t, 7));
        assert_eq!(minimal.children, vec![leaf(2), leaf(7)]);
    }

    #[test]
    fn descends_into_nested_children() {
        let tree = Tree {
            label: 0,
            children: vec![
                leaf(1),
                Tree {
                    label: 2,
                    children: vec![leaf(20), leaf(21), leaf(22)],
                },
            ],
        };
        let minimal = shrink(tree, |t| contains(t, 21));
        assert_eq!(
            minimal.children,
            vec![Tree {
                label: 2,
                children: vec![leaf(21)]
            }]
        );
    }

    #[test]
    fn logged_report_matches_calls() {
        let tree = Tree {
            label: 0,
            children: (1..=4).map(leaf).collect(),
        };
        let report = shrink_logged(tree, |t| contains(t, 3));
        assert_eq!(report.minimized.children, vec![leaf(3)]);
        // Every recorded step is one predicate call; the initial check is not
        // recorded.
        assert_eq!(report.steps.len() + 1, report.predicate_calls);
        assert!(report.steps.iter().any(|s| s.accepted));
        let jsonl = report.steps_jsonl().unwrap();
        assert_eq!(jsonl.lines().count(), report.steps.len());
        assert!(jsonl.contains("\"phase\":\"drop_chunk\""));
    }

    #[test]
    #[should_panic(expected = "failure must reproduce")]
    fn rejects_a_passing_input() {
        let _ = shrink(leaf(0), |_| false);
    }
}
