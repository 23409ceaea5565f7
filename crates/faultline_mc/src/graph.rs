//! Continuation graphs of a single transition.
//!
//! Continuation 0 is the start of the transition. Every choice splits the
//! continuation it is made in into a contiguous range of child
//! continuations, one per option. Continuations that are never split are
//! the leaves: each one ends exactly one enumerated path.

use faultline_model::Probability;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Kind of split performed at a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceKind {
    /// Not split; a leaf.
    UnsplitOrFinal,
    /// Single remaining option.
    Deterministic,
    /// Resolved by a scheduler.
    Nondeterministic,
    /// Resolved by fixed branch probabilities.
    Probabilistic,
}

/// One continuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChoiceNode {
    /// How this continuation is split.
    pub kind: ChoiceKind,
    /// First child continuation.
    pub from: usize,
    /// Last child continuation (inclusive).
    pub to: usize,
    /// Probability of reaching this continuation from its parent.
    ///
    /// Only meaningful below probabilistic splits; 1 elsewhere.
    pub probability: Probability,
}

impl ChoiceNode {
    /// An unsplit continuation.
    #[must_use]
    pub const fn leaf(probability: Probability) -> Self {
        Self {
            kind: ChoiceKind::UnsplitOrFinal,
            from: 0,
            to: 0,
            probability,
        }
    }

    /// A split continuation.
    #[must_use]
    pub const fn split(kind: ChoiceKind, from: usize, to: usize, probability: Probability) -> Self {
        Self {
            kind,
            from,
            to,
            probability,
        }
    }

    /// Returns true if this continuation is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.kind == ChoiceKind::UnsplitOrFinal
    }

    /// Child continuation ids; empty for leaves.
    #[must_use]
    pub fn children(&self) -> RangeInclusive<usize> {
        if self.is_leaf() {
            #[allow(clippy::reversed_empty_ranges)]
            return 1..=0;
        }
        self.from..=self.to
    }

    /// Number of options of this choice.
    #[must_use]
    pub fn option_count(&self) -> usize {
        if self.is_leaf() {
            0
        } else {
            self.to - self.from + 1
        }
    }
}

/// Continuation graph recorded while enumerating one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationGraph {
    nodes: Vec<ChoiceNode>,
}

impl Default for ContinuationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuationGraph {
    /// Creates a graph holding only the unsplit root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![ChoiceNode::leaf(Probability::ONE)],
        }
    }

    /// Builds a graph from explicit nodes; node 0 is the root.
    ///
    /// The nodes are not validated here; the distribution mapper rejects
    /// malformed graphs.
    #[must_use]
    pub fn from_nodes(nodes: Vec<ChoiceNode>) -> Self {
        Self { nodes }
    }

    /// Resets the graph to the unsplit root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(ChoiceNode::leaf(Probability::ONE));
    }

    /// Returns the continuation `cid`.
    #[must_use]
    pub fn node(&self, cid: usize) -> Option<&ChoiceNode> {
        self.nodes.get(cid)
    }

    /// Number of continuations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Splits `cid` into `count` children and returns the first child id.
    ///
    /// Splitting an already split continuation returns its existing range.
    /// Children of probabilistic splits take their branch probability from
    /// `probabilities`; all other children get probability 1.
    pub(crate) fn split(
        &mut self,
        cid: usize,
        kind: ChoiceKind,
        count: usize,
        probabilities: Option<&[Probability]>,
    ) -> usize {
        if let Some(node) = self.nodes.get(cid) {
            if !node.is_leaf() {
                return node.from;
            }
        }
        let count = count.max(1);
        let from = self.nodes.len();
        for option in 0..count {
            let probability = probabilities
                .and_then(|p| p.get(option).copied())
                .unwrap_or(Probability::ONE);
            self.nodes.push(ChoiceNode::leaf(probability));
        }
        if let Some(node) = self.nodes.get_mut(cid) {
            node.kind = kind;
            node.from = from;
            node.to = from + count - 1;
        }
        from
    }

    /// Collapses the split at `cid` onto its first child.
    pub(crate) fn make_deterministic(&mut self, cid: usize) {
        if let Some(node) = self.nodes.get_mut(cid) {
            if !node.is_leaf() {
                node.kind = ChoiceKind::Deterministic;
                node.to = node.from;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_allocates_contiguous_children() {
        let mut graph = ContinuationGraph::new();
        let from = graph.split(0, ChoiceKind::Nondeterministic, 3, None);
        assert_eq!(from, 1);
        let root = graph.node(0).unwrap();
        assert_eq!(root.children(), 1..=3);
        assert_eq!(root.option_count(), 3);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn splitting_twice_reuses_range() {
        let mut graph = ContinuationGraph::new();
        let first = graph.split(0, ChoiceKind::Nondeterministic, 2, None);
        let second = graph.split(0, ChoiceKind::Nondeterministic, 2, None);
        assert_eq!(first, second);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn probabilistic_children_carry_branch_probability() {
        let mut graph = ContinuationGraph::new();
        let p = [Probability::new(0.25).unwrap(), Probability::new(0.75).unwrap()];
        graph.split(0, ChoiceKind::Probabilistic, 2, Some(&p));
        assert!(graph.node(2).unwrap().probability.is_close(p[1]));
    }

    #[test]
    fn deterministic_collapse_keeps_first_child() {
        let mut graph = ContinuationGraph::new();
        graph.split(0, ChoiceKind::Probabilistic, 3, None);
        graph.make_deterministic(0);
        let root = graph.node(0).unwrap();
        assert_eq!(root.kind, ChoiceKind::Deterministic);
        assert_eq!(root.children(), 1..=1);
    }

    #[test]
    fn leaves_have_no_children() {
        let graph = ContinuationGraph::new();
        assert_eq!(graph.node(0).unwrap().children().count(), 0);
    }
}
