//! Dynamic fault bit-sets.
//!
//! A [`FaultSet`] holds one bit per fault id in a growable word vector.
//! Trailing zero words are always trimmed, so two sets with the same members
//! compare and hash equal regardless of how they were built.

use crate::fault::FaultId;
use serde::{Deserialize, Serialize};
use std::fmt;

const WORD_BITS: usize = 64;

/// A set of fault ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawFaultSet")]
pub struct FaultSet {
    words: Vec<u64>,
}

/// Wire form of [`FaultSet`]; trimmed on conversion.
#[derive(Deserialize)]
struct RawFaultSet {
    words: Vec<u64>,
}

impl From<RawFaultSet> for FaultSet {
    fn from(raw: RawFaultSet) -> Self {
        let mut set = Self { words: raw.words };
        set.trim();
        set
    }
}

impl FaultSet {
    /// Creates the empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates a set containing exactly `id`.
    #[must_use]
    pub fn singleton(id: FaultId) -> Self {
        let mut set = Self::empty();
        set.insert(id);
        set
    }

    /// Adds a fault to the set.
    pub fn insert(&mut self, id: FaultId) {
        let (word, bit) = position(id);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    /// Removes a fault from the set.
    pub fn remove(&mut self, id: FaultId) {
        let (word, bit) = position(id);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !bit;
        }
        self.trim();
    }

    /// Returns a copy of the set with `id` added.
    #[must_use]
    pub fn with(&self, id: FaultId) -> Self {
        let mut set = self.clone();
        set.insert(id);
        set
    }

    /// Returns true if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: FaultId) -> bool {
        let (word, bit) = position(id);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns true if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns true if every member of `self` is a member of `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.words.len() <= other.words.len()
            && self
                .words
                .iter()
                .zip(&other.words)
                .all(|(a, b)| a & !b == 0)
    }

    /// Returns true if every member of `other` is a member of `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.is_subset_of(self)
    }

    /// Returns true if `self` is a subset of `other` and not equal to it.
    #[must_use]
    pub fn is_proper_subset_of(&self, other: &Self) -> bool {
        self != other && self.is_subset_of(other)
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (long, short) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut words = long.words.clone();
        for (w, s) in words.iter_mut().zip(&short.words) {
            *w |= s;
        }
        Self { words }
    }

    /// Returns the intersection of both sets.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut set = Self {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| a & b)
                .collect(),
        };
        set.trim();
        set
    }

    /// Iterates over the members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = FaultId> + '_ {
        self.words.iter().enumerate().flat_map(|(word, &bits)| {
            (0..WORD_BITS)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| FaultId::new(word * WORD_BITS + bit))
        })
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

const fn position(id: FaultId) -> (usize, u64) {
    (id.index() / WORD_BITS, 1 << (id.index() % WORD_BITS))
}

impl FromIterator<FaultId> for FaultSet {
    fn from_iter<I: IntoIterator<Item = FaultId>>(iter: I) -> Self {
        let mut set = Self::empty();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl fmt::Display for FaultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.iter().map(|id| id.index().to_string()).collect();
        write!(f, "{{{}}}", ids.join(", "))
    }
}
