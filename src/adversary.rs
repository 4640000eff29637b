//! # Colluding Adversaries
//!
//! Adversarial peers share a single pool holding every colluding
//! identifier. Their finger tables are built against that pool alone, which
//! yields an attack ring that is internally consistent but skips every honest
//! peer. When asked, an adversary discloses this table.
//!
//! Adversaries do not take part in the defense: gossip they receive is
//! dropped, verification is a no-op, and the gossip they send is a fresh
//! sample of the pool each round rather than their real neighbours.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::fingers::{FingerTable, FINGER_COUNT};
use crate::identity::PeerIdentity;
use crate::protocols::{GuardedGossip, Verdict};
use crate::ring::Identifier;

#[derive(Debug)]
pub struct AdversaryPeer {
    identity: PeerIdentity,
    table: FingerTable,
    pool: Arc<[Identifier]>,
    guarded: BTreeSet<Identifier>,
    gossiped: BTreeSet<Identifier>,
}

impl AdversaryPeer {
    pub fn new(identity: PeerIdentity, table: FingerTable, pool: Arc<[Identifier]>) -> Self {
        Self {
            identity,
            table,
            pool,
            guarded: BTreeSet::new(),
            gossiped: BTreeSet::new(),
        }
    }

    /// The colluding identifiers, shared with every other adversary.
    pub fn pool(&self) -> &Arc<[Identifier]> {
        &self.pool
    }
}

impl GuardedGossip for AdversaryPeer {
    fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    fn is_honest(&self) -> bool {
        false
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

    /// M draws from the pool, with replacement.
    fn send_gossip(&self, rng: &mut dyn RngCore) -> Vec<Identifier> {
        let mut sends = Vec::with_capacity(FINGER_COUNT);
        for _ in 0..FINGER_COUNT {
            if let Some(id) = self.pool.choose(rng) {
                sends.push(*id);
            }
        }
        sends
    }

    fn recv_gossip(&mut self, _from: Identifier, _round: u64) {}

    fn request_finger_table(&mut self, rng: &mut dyn RngCore) -> Option<Identifier> {
        let index = rng.gen_range(1..FINGER_COUNT);
        Some(self.table.fingers()[index].node)
    }

    fn guarded_gossip(&mut self, _presented: &FingerTable, _round: u64, _rng: &mut dyn RngCore) -> Verdict {
        Verdict::Ignored
    }
}
