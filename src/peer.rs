//! # Honest Peers
//!
//! An honest peer never trusts gossip directly. Gossip only nominates
//! candidates; a candidate's finger table has to survive two checks before
//! any of its entries are admitted to the guard set:
//!
//! - **Density bound**: the presented table's density against its owner's
//!   ideal ids must not exceed this peer's own density times `D_TOLERANCE`.
//! - **Witness list**: for every slot, the closest identifier this peer has
//!   witnessed must not sit strictly closer to the slot's ideal id than the
//!   presented entry. If it does, the entry was substituted (or is badly
//!   stale) and the whole table is discarded.
//!
//! ## State
//!
//! | Field | Bound | Purpose |
//! |-------|-------|---------|
//! | `witnesses` | unbounded | last round each identifier was seen |
//! | `gossiped` | `max_gossips` | candidates awaiting verification |
//! | `picked_gossip` | `max_gossips` | candidates already verified once |
//! | `guarded` | `max_guards` | identifiers trusted as routing references |
//!
//! Bounded sets are trimmed by evicting uniformly random members after every
//! verification attempt.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::{debug, trace};

use crate::config::PeerPolicy;
use crate::fingers::{density, FingerTable, FINGER_COUNT};
use crate::identity::PeerIdentity;
use crate::protocols::{GuardedGossip, Verdict};
use crate::ring::{wrapped_distance, Identifier};

#[derive(Debug)]
pub struct HonestPeer {
    identity: PeerIdentity,
    table: FingerTable,
    ideal_ids: [Identifier; FINGER_COUNT],
    witnesses: BTreeMap<Identifier, u64>,
    gossiped: BTreeSet<Identifier>,
    picked_gossip: BTreeSet<Identifier>,
    guarded: BTreeSet<Identifier>,
    expected_density: f64,
    policy: Arc<PeerPolicy>,
}

impl HonestPeer {
    /// Wrap a fully constructed finger table. The peer's expected density is
    /// taken from this table and never recomputed.
    pub fn new(identity: PeerIdentity, table: FingerTable, policy: Arc<PeerPolicy>) -> Self {
        debug_assert_eq!(identity.id, table.owner());
        let ideal_ids = table.ideal_ids();
        let expected_density = density(&table, &ideal_ids);
        Self {
            identity,
            table,
            ideal_ids,
            witnesses: BTreeMap::new(),
            gossiped: BTreeSet::new(),
            picked_gossip: BTreeSet::new(),
            guarded: BTreeSet::new(),
            expected_density,
            policy,
        }
    }

    pub fn expected_density(&self) -> f64 {
        self.expected_density
    }

    pub fn ideal_finger_ids(&self) -> &[Identifier; FINGER_COUNT] {
        &self.ideal_ids
    }

    pub fn witnesses(&self) -> &BTreeMap<Identifier, u64> {
        &self.witnesses
    }

    pub fn picked_gossip(&self) -> &BTreeSet<Identifier> {
        &self.picked_gossip
    }

    pub fn policy(&self) -> &PeerPolicy {
        &self.policy
    }

    /// Record `id` as seen during `round`.
    pub fn witness(&mut self, id: Identifier, round: u64) {
        self.witnesses.insert(id, round);
    }

    pub fn update_successor(&mut self, node: Identifier) {
        self.table.update_successor(node);
    }

    /// Random non-successor finger, index uniform in `1..M`.
    pub fn pick_finger<R: Rng + ?Sized>(&self, rng: &mut R) -> Identifier {
        let index = rng.gen_range(1..FINGER_COUNT);
        self.table.fingers()[index].node
    }

    /// Witnessed identifier with the smallest absolute difference to `query`.
    /// Ties resolve to the lower identifier.
    pub fn best_witness(&self, query: Identifier) -> Option<Identifier> {
        let below = self.witnesses.range(..=query).next_back().map(|(id, _)| *id);
        let above = self.witnesses.range(query..).next().map(|(id, _)| *id);
        match (below, above) {
            (Some(low), Some(high)) if query.abs_diff(high) < query.abs_diff(low) => Some(high),
            (Some(low), _) => Some(low),
            (None, high) => high,
        }
    }

    pub fn bound_check(&self, presented: &FingerTable) -> bool {
        self.check_density(presented).is_ok()
    }

    pub fn witness_list_check(&self, presented: &FingerTable) -> bool {
        self.check_witnesses(presented).is_ok()
    }

    fn check_density(&self, presented: &FingerTable) -> Result<(), Verdict> {
        let presented_density = density(presented, &presented.ideal_ids());
        let bound = if self.policy.d_tolerance.is_infinite() {
            f64::INFINITY
        } else {
            self.expected_density * self.policy.d_tolerance
        };
        if presented_density <= bound {
            Ok(())
        } else {
            Err(Verdict::RejectedDensity { presented: presented_density, bound })
        }
    }

    fn check_witnesses(&self, presented: &FingerTable) -> Result<(), Verdict> {
        let ideal = presented.ideal_ids();
        for (slot, finger) in presented.fingers().iter().enumerate() {
            let Some(witness) = self.best_witness(finger.node) else {
                return Ok(());
            };
            if witness == finger.node {
                continue;
            }
            let witness_distance = wrapped_distance(ideal[slot], witness);
            let presented_distance = wrapped_distance(ideal[slot], finger.node);
            if witness_distance < presented_distance {
                return Err(Verdict::RejectedWitness { slot, presented: finger.node, witness });
            }
        }
        Ok(())
    }

    /// Add the presented identifiers to the guard set and witness them.
    fn admit<R: Rng + ?Sized>(&mut self, presented: &FingerTable, round: u64, rng: &mut R) -> usize {
        let distinct: Vec<Identifier> = presented.distinct_nodes().into_iter().collect();
        let admitted: BTreeSet<Identifier> = match &self.policy.guard_sample {
            Some(sample) => {
                let draws = rng.gen_range(sample.clone());
                let mut picked = BTreeSet::new();
                for _ in 0..draws {
                    if let Some(id) = distinct.choose(rng) {
                        picked.insert(*id);
                    }
                }
                picked
            }
            None => distinct.into_iter().collect(),
        };
        for id in &admitted {
            self.guarded.insert(*id);
            self.witnesses.insert(*id, round);
        }
        admitted.len()
    }

    /// Trim every bounded set back to its capacity.
    pub fn maintain<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let guards = evict_random(&mut self.guarded, self.policy.max_guards, rng);
        let gossips = evict_random(&mut self.gossiped, self.policy.max_gossips, rng);
        let picked = evict_random(&mut self.picked_gossip, self.policy.max_gossips, rng);
        if guards + gossips + picked > 0 {
            trace!(peer = %self.identity.id, guards, gossips, picked, "evicted over-capacity entries");
        }
    }
}

impl GuardedGossip for HonestPeer {
    fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    fn is_honest(&self) -> bool {
        true
    }

    fn finger_table(&self) -> &FingerTable {
        &self.table
    }

    fn guarded(&self) -> &BTreeSet<Identifier> {
        &self.guarded
    }

    fn gossiped(&self) -> &BTreeSet<Identifier> {
        &self.gossiped
    }

    fn send_gossip(&self, _rng: &mut dyn RngCore) -> Vec<Identifier> {
        self.table.nodes().collect()
    }

    fn recv_gossip(&mut self, from: Identifier, round: u64) {
        if let Some(&last_seen) = self.witnesses.get(&from) {
            if round.saturating_sub(last_seen) < self.policy.gossip_window {
                trace!(peer = %self.identity.id, from = %from, last_seen, round, "gossip inside replay window");
                return;
            }
        }
        self.gossiped.insert(from);
        self.witnesses.insert(from, round);
    }

    fn request_finger_table(&mut self, rng: &mut dyn RngCore) -> Option<Identifier> {
        if self.gossiped.is_empty() && self.policy.recycle_picked_gossip && !self.picked_gossip.is_empty() {
            self.gossiped = std::mem::take(&mut self.picked_gossip);
        }
        if !self.gossiped.is_empty() {
            let index = rng.gen_range(0..self.gossiped.len());
            let candidate = self.gossiped.iter().nth(index).copied()?;
            self.gossiped.remove(&candidate);
            self.picked_gossip.insert(candidate);
            return Some(candidate);
        }
        Some(self.pick_finger(rng))
    }

    fn guarded_gossip(&mut self, presented: &FingerTable, round: u64, rng: &mut dyn RngCore) -> Verdict {
        let target = presented.owner();
        self.witnesses.insert(target, round);

        let verdict = if self.policy.enforce_checks {
            match self.check_density(presented).and_then(|()| self.check_witnesses(presented)) {
                Ok(()) => Verdict::Accepted { admitted: self.admit(presented, round, rng) },
                Err(rejection) => rejection,
            }
        } else {
            Verdict::Bypassed { admitted: self.admit(presented, round, rng) }
        };
        self.maintain(rng);

        match verdict {
            Verdict::RejectedDensity { presented, bound } => debug!(
                peer = %self.identity.id,
                target = %target,
                presented,
                bound,
                "finger table rejected: density above bound"
            ),
            Verdict::RejectedWitness { slot, presented, witness } => debug!(
                peer = %self.identity.id,
                target = %target,
                slot,
                presented = %presented,
                witness = %witness,
                "finger table rejected: closer witness omitted"
            ),
            _ => trace!(peer = %self.identity.id, target = %target, ?verdict, "finger table verified"),
        }
        verdict
    }
}

/// Remove uniformly random members until `set` holds at most `capacity`.
/// Victims are drawn from the ordered snapshot of the set, so the outcome
/// depends only on the set contents and the generator state.
pub fn evict_random<T, R>(set: &mut BTreeSet<T>, capacity: usize, rng: &mut R) -> usize
where
    T: Ord + Copy,
    R: Rng + ?Sized,
{
    let excess = set.len().saturating_sub(capacity);
    if excess == 0 {
        return 0;
    }
    let snapshot: Vec<T> = set.iter().copied().collect();
    for index in rand::seq::index::sample(rng, snapshot.len(), excess).into_iter() {
        set.remove(&snapshot[index]);
    }
    excess
}
