//! Flattening of continuation graphs into successor distributions.
//!
//! The mapper walks a [`ContinuationGraph`] in pre-order and records every
//! split it passes. Leaves are the continuations that end a path; each
//! explored path stores its successor state under its leaf id. Resolving
//! each nondeterministic split in every possible way then yields the
//! probability distributions over leaves that make up the transitions of
//! a Markov decision process.

use crate::error::{Error, Result};
use crate::graph::{ChoiceKind, ContinuationGraph};
use faultline_model::Probability;
use std::collections::BTreeMap;

/// Kind of a registered split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// Resolved by a scheduler; single-option splits are registered as this kind too.
    NonDeterministic,
    /// Resolved by branch probabilities.
    Probabilistic,
}

/// A split of one continuation into `from..=to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Kind of the split.
    pub kind: SplitKind,
    /// First child.
    pub from: usize,
    /// Last child (inclusive).
    pub to: usize,
    /// Branch probabilities, one per child; empty for nondeterministic splits.
    pub probabilities: Vec<Probability>,
}

/// A probability distribution over leaf continuations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Distribution {
    entries: Vec<(usize, Probability)>,
}

impl Distribution {
    fn point(cid: usize) -> Self {
        Self {
            entries: vec![(cid, Probability::ONE)],
        }
    }

    /// Entries as `(leaf, probability)` pairs, ordered by leaf id.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Probability)> + '_ {
        self.entries.iter().copied()
    }

    /// Probability of reaching `cid`.
    #[must_use]
    pub fn probability(&self, cid: usize) -> Probability {
        self.entries
            .iter()
            .filter(|(leaf, _)| *leaf == cid)
            .map(|(_, p)| *p)
            .sum()
    }

    /// Sum of all entries; 1 for well-formed graphs.
    #[must_use]
    pub fn total(&self) -> Probability {
        self.entries.iter().map(|(_, p)| *p).sum()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the distribution has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registers the splits of a continuation graph and enumerates its distributions.
#[derive(Debug, Clone, Default)]
pub struct ContinuationDistributionMapper {
    splits: BTreeMap<usize, Split>,
    leaves: Vec<usize>,
}

impl ContinuationDistributionMapper {
    /// Creates an empty mapper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all registered splits.
    pub fn clear(&mut self) {
        self.splits.clear();
        self.leaves.clear();
    }

    /// Registers a nondeterministic split of `source`.
    pub fn non_deterministic_split(&mut self, source: usize, from: usize, to: usize) {
        self.splits.insert(
            source,
            Split {
                kind: SplitKind::NonDeterministic,
                from,
                to,
                probabilities: Vec::new(),
            },
        );
    }

    /// Registers a probabilistic split of `source`.
    pub fn probabilistic_split(
        &mut self,
        source: usize,
        from: usize,
        to: usize,
        probabilities: &[Probability],
    ) {
        self.splits.insert(
            source,
            Split {
                kind: SplitKind::Probabilistic,
                from,
                to,
                probabilities: probabilities.to_vec(),
            },
        );
    }

    /// Walks `graph` from continuation 0 and registers all its splits.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedGraph` if a continuation is reached twice
    /// or a child id lies outside the graph.
    pub fn map(&mut self, graph: &ContinuationGraph) -> Result<()> {
        self.clear();
        if graph.is_empty() {
            return Err(Error::MalformedGraph("graph has no root".to_string()));
        }

        let mut visited = vec![false; graph.len()];
        let mut stack = vec![0usize];

        while let Some(cid) = stack.pop() {
            let node = graph.node(cid).ok_or_else(|| {
                Error::MalformedGraph(format!("continuation {cid} is out of range"))
            })?;
            if visited[cid] {
                return Err(Error::MalformedGraph(format!(
                    "continuation {cid} is reached twice"
                )));
            }
            visited[cid] = true;

            if node.is_leaf() {
                self.leaves.push(cid);
                continue;
            }
            if node.from > node.to || node.to >= graph.len() {
                return Err(Error::MalformedGraph(format!(
                    "continuation {cid} splits into invalid range {}..={}",
                    node.from, node.to
                )));
            }

            match node.kind {
                ChoiceKind::Probabilistic => {
                    let probabilities: Vec<Probability> = node
                        .children()
                        .filter_map(|child| graph.node(child).map(|c| c.probability))
                        .collect();
                    self.probabilistic_split(cid, node.from, node.to, &probabilities);
                }
                ChoiceKind::Deterministic | ChoiceKind::Nondeterministic => {
                    self.non_deterministic_split(cid, node.from, node.to);
                }
                ChoiceKind::UnsplitOrFinal => {}
            }

            // Reverse push keeps the first child on top of the stack.
            stack.extend(node.children().rev());
        }

        self.leaves.sort_unstable();
        Ok(())
    }

    /// The split registered for `cid`, if any.
    #[must_use]
    pub fn split(&self, cid: usize) -> Option<&Split> {
        self.splits.get(&cid)
    }

    /// Leaf continuations found by the last [`map`](Self::map), in id order.
    #[must_use]
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    /// Returns true if some split must be resolved by a scheduler.
    #[must_use]
    pub fn has_nondeterminism(&self) -> bool {
        self.splits
            .values()
            .any(|s| s.kind == SplitKind::NonDeterministic && s.to > s.from)
    }

    /// Enumerates one distribution per resolution of the nondeterministic splits.
    ///
    /// Without nondeterminism the result holds exactly one distribution.
    #[must_use]
    pub fn distributions(&self) -> Vec<Distribution> {
        self.resolve(0)
            .into_iter()
            .map(|mut d| {
                d.entries.sort_by_key(|(cid, _)| *cid);
                d
            })
            .collect()
    }

    fn resolve(&self, cid: usize) -> Vec<Distribution> {
        let Some(split) = self.splits.get(&cid) else {
            return vec![Distribution::point(cid)];
        };

        match split.kind {
            SplitKind::NonDeterministic => (split.from..=split.to)
                .flat_map(|child| self.resolve(child))
                .collect(),
            SplitKind::Probabilistic => {
                let mut combined = vec![Distribution::default()];
                for (offset, child) in (split.from..=split.to).enumerate() {
                    let branch = split
                        .probabilities
                        .get(offset)
                        .copied()
                        .unwrap_or(Probability::ZERO);
                    let options = self.resolve(child);
                    let mut next = Vec::with_capacity(combined.len() * options.len());
                    for partial in &combined {
                        for option in &options {
                            let mut entries = partial.entries.clone();
                            entries.extend(option.iter().map(|(leaf, p)| (leaf, p * branch)));
                            next.push(Distribution { entries });
                        }
                    }
                    combined = next;
                }
                combined
            }
        }
    }
}
