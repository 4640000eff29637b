//! # Ring Topology
//!
//! The overlay is assumed to be pre-stabilized: membership is frozen before
//! the first round and every finger table is computed once from a sorted
//! snapshot of the member identifiers. Lookups are binary searches over that
//! snapshot, so construction does not depend on the order in which peers are
//! processed.
//!
//! The same snapshot type serves both rings the simulation needs: the full
//! population ring for honest peers and the adversary-only attack ring.

use crate::fingers::{ideal_finger_ids, Finger, FingerTable, FINGER_COUNT};
use crate::ring::{add, Identifier};

/// Sorted, deduplicated set of ring members.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RingSnapshot {
    sorted: Vec<Identifier>,
}

impl RingSnapshot {
    pub fn new(ids: impl IntoIterator<Item = Identifier>) -> Self {
        let mut sorted: Vec<Identifier> = ids.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self { sorted }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn ids(&self) -> &[Identifier] {
        &self.sorted
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.sorted.binary_search(id).is_ok()
    }

    pub fn min(&self) -> Option<Identifier> {
        self.sorted.first().copied()
    }

    pub fn max(&self) -> Option<Identifier> {
        self.sorted.last().copied()
    }

    /// Smallest member `>= query`, cycling to the smallest member.
    pub fn successor(&self, query: Identifier) -> Option<Identifier> {
        let idx = self.sorted.partition_point(|id| *id < query);
        self.sorted.get(idx).copied().or_else(|| self.min())
    }

    /// Largest member `< query`, cycling to the largest member.
    pub fn predecessor(&self, query: Identifier) -> Option<Identifier> {
        let idx = self.sorted.partition_point(|id| *id < query);
        match idx {
            0 => self.max(),
            _ => Some(self.sorted[idx - 1]),
        }
    }

    /// Finger table of `owner` as seen from this snapshot.
    ///
    /// Slot 0 looks up `owner + 1`, slot `i` looks up `owner + 2^i`.
    /// Returns `None` only for an empty snapshot.
    pub fn finger_table(&self, owner: Identifier) -> Option<FingerTable> {
        let predecessor = self.predecessor(owner)?;
        let ideal = ideal_finger_ids(owner);
        debug_assert_eq!(ideal[0], add(owner, Identifier::new(1)));

        let mut fingers = [Finger { start: owner, node: owner }; FINGER_COUNT];
        for (slot, start) in fingers.iter_mut().zip(ideal) {
            *slot = Finger { start, node: self.successor(start)? };
        }
        Some(FingerTable::new(owner, predecessor, fingers))
    }
}
