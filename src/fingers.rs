//! # Finger Tables
//!
//! A Chord finger table holds one entry per bit of the identifier space.
//! Entry `i` records the ideal lookup target `owner + 2^i` (`start`) and the
//! peer found responsible for it (`node`). Entry 0 is the successor.
//!
//! ## Density
//!
//! The density of a table relative to a set of ideal ids is the mean
//! clockwise distance from each ideal id to the node actually stored in that
//! slot. An honestly built table keeps every node close behind its ideal id,
//! so its density is roughly the average gap between peers. A table skewed
//! toward colluding peers has to skip over honest ones and ends up with a
//! larger density, which is what the bound check in [`crate::peer`] looks at.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::ring::{add, finger_offset, in_interval, wrapped_distance, Identifier, RING_BITS};

/// Entries per finger table (M).
pub const FINGER_COUNT: usize = RING_BITS as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Finger {
    /// Ideal lookup target for this slot.
    pub start: Identifier,
    /// Peer responsible for `start`.
    pub node: Identifier,
}

/// `owner + 2^i (mod 2^32)` for every slot `i`.
pub fn ideal_finger_ids(owner: Identifier) -> [Identifier; FINGER_COUNT] {
    std::array::from_fn(|i| add(owner, finger_offset(i)))
}

/// Mean clockwise distance between each `fingers[i].node` and `ideal_ids[i]`.
pub fn density(table: &FingerTable, ideal_ids: &[Identifier; FINGER_COUNT]) -> f64 {
    let total: u64 = table
        .fingers
        .iter()
        .zip(ideal_ids.iter())
        .map(|(finger, ideal)| u64::from(wrapped_distance(*ideal, finger.node)))
        .sum();
    total as f64 / FINGER_COUNT as f64
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerTable {
    owner: Identifier,
    predecessor: Identifier,
    fingers: [Finger; FINGER_COUNT],
}

impl FingerTable {
    pub fn new(owner: Identifier, predecessor: Identifier, fingers: [Finger; FINGER_COUNT]) -> Self {
        Self { owner, predecessor, fingers }
    }

    /// Build a table whose slot `i` points at `nodes[i]`, with ideal starts.
    pub fn from_nodes(
        owner: Identifier,
        predecessor: Identifier,
        nodes: [Identifier; FINGER_COUNT],
    ) -> Self {
        let ideal = ideal_finger_ids(owner);
        let fingers = std::array::from_fn(|i| Finger { start: ideal[i], node: nodes[i] });
        Self { owner, predecessor, fingers }
    }

    pub fn owner(&self) -> Identifier {
        self.owner
    }

    pub fn predecessor(&self) -> Identifier {
        self.predecessor
    }

    pub fn successor(&self) -> Identifier {
        self.fingers[0].node
    }

    /// Slot 0 is the only entry that may change after construction.
    pub fn update_successor(&mut self, node: Identifier) {
        self.fingers[0].node = node;
    }

    pub fn fingers(&self) -> &[Finger; FINGER_COUNT] {
        &self.fingers
    }

    pub fn get(&self, index: usize) -> Option<&Finger> {
        self.fingers.get(index)
    }

    pub fn nodes(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.fingers.iter().map(|finger| finger.node)
    }

    pub fn distinct_nodes(&self) -> BTreeSet<Identifier> {
        self.nodes().collect()
    }

    pub fn ideal_ids(&self) -> [Identifier; FINGER_COUNT] {
        ideal_finger_ids(self.owner)
    }

    /// Density of this table against its owner's own ideal ids.
    pub fn density(&self) -> f64 {
        density(self, &self.ideal_ids())
    }

    /// Whether the owner is responsible for `key`, i.e. `key` is in
    /// `(predecessor, owner]`. A lone peer covers the whole ring.
    pub fn covers(&self, key: Identifier) -> bool {
        self.predecessor == self.owner || in_interval(key, self.predecessor, self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::sub;

    fn id(raw: u32) -> Identifier {
        Identifier::new(raw)
    }

    #[test]
    fn ideal_ids_wrap_around_the_ring() {
        let owner = id(u32::MAX - 1);
        let ideal = ideal_finger_ids(owner);
        assert_eq!(ideal[0], id(u32::MAX));
        assert_eq!(ideal[1], id(0));
        assert_eq!(ideal[2], id(2));
        assert_eq!(ideal[31], id((1u32 << 31) - 2));
    }

    #[test]
    fn perfectly_placed_table_has_zero_density() {
        let owner = id(1_000);
        let table = FingerTable::from_nodes(owner, id(10), ideal_finger_ids(owner));
        assert_eq!(table.density(), 0.0);
    }

    #[test]
    fn maximally_displaced_table_has_ring_sized_density() {
        let owner = id(77);
        let nodes = ideal_finger_ids(owner).map(|ideal| sub(ideal, id(1)));
        let table = FingerTable::from_nodes(owner, id(10), nodes);
        assert_eq!(table.density(), f64::from(u32::MAX));
    }

    #[test]
    fn density_uses_supplied_ideal_ids() {
        let owner = id(0);
        let table = FingerTable::from_nodes(owner, id(0), ideal_finger_ids(owner));
        let shifted = ideal_finger_ids(id(0)).map(|ideal| sub(ideal, id(64)));
        assert_eq!(density(&table, &shifted), 64.0);
    }

    #[test]
    fn successor_can_be_updated() {
        let owner = id(5);
        let mut table = FingerTable::from_nodes(owner, id(1), [id(9); FINGER_COUNT]);
        assert_eq!(table.successor(), id(9));
        table.update_successor(id(6));
        assert_eq!(table.successor(), id(6));
        assert_eq!(table.get(1).map(|f| f.node), Some(id(9)));
        assert_eq!(table.get(0).map(|f| f.start), Some(id(6)));
        assert!(table.get(FINGER_COUNT).is_none());
    }

    #[test]
    fn distinct_nodes_collapse_repeats() {
        let owner = id(5);
        let mut nodes = [id(9); FINGER_COUNT];
        nodes[FINGER_COUNT - 1] = id(3);
        let table = FingerTable::from_nodes(owner, id(3), nodes);
        assert_eq!(table.nodes().count(), FINGER_COUNT);
        assert_eq!(table.distinct_nodes().into_iter().collect::<Vec<_>>(), vec![id(3), id(9)]);
    }

    #[test]
    fn covers_keys_between_predecessor_and_owner() {
        let table = FingerTable::from_nodes(id(100), id(50), [id(200); FINGER_COUNT]);
        assert!(table.covers(id(51)));
        assert!(table.covers(id(100)));
        assert!(!table.covers(id(50)));
        assert!(!table.covers(id(101)));

        let wrapped = FingerTable::from_nodes(id(10), id(u32::MAX - 10), [id(200); FINGER_COUNT]);
        assert!(wrapped.covers(id(0)));
        assert!(wrapped.covers(id(u32::MAX)));

        let lone = FingerTable::from_nodes(id(10), id(10), [id(10); FINGER_COUNT]);
        assert!(lone.covers(id(12345)));
    }
}
