//! Protocol trait definitions for the GuardedGossip overlay.
//!
//! The overlay driver talks to every peer through [`GuardedGossip`]. Honest
//! peers ([`crate::peer::HonestPeer`]) and colluding adversaries
//! ([`crate::adversary::AdversaryPeer`]) implement the same trait, so the
//! round loop never branches on the kind of peer it is driving.
//!
//! ## Round Operations
//!
//! | Phase | Operation | Purpose |
//! |-------|-----------|---------|
//! | Gossip | [`GuardedGossip::send_gossip`] | Identifiers to push gossip to |
//! | Gossip | [`GuardedGossip::recv_gossip`] | Buffer a sender as a verification candidate |
//! | Verify | [`GuardedGossip::request_finger_table`] | Choose whose finger table to inspect |
//! | Verify | [`GuardedGossip::guarded_gossip`] | Check a disclosed table and admit guards |
//!
//! Randomness is passed in by the driver as `&mut dyn RngCore` so a single
//! seeded generator reproduces a whole run.

use std::collections::BTreeSet;

use rand::RngCore;

use crate::fingers::FingerTable;
use crate::identity::PeerIdentity;
use crate::ring::Identifier;

/// Outcome of one verification attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    /// Both checks passed; `admitted` identifiers were offered to the guard set.
    Accepted { admitted: usize },
    /// Checks disabled; `admitted` identifiers were offered unconditionally.
    Bypassed { admitted: usize },
    /// The presented density exceeded `expected * D_TOLERANCE`.
    RejectedDensity { presented: f64, bound: f64 },
    /// A witness sits strictly closer to the ideal id of `slot` than the
    /// presented finger does.
    RejectedWitness { slot: usize, presented: Identifier, witness: Identifier },
    /// The peer does not verify (adversaries).
    Ignored,
}

impl Verdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::Bypassed { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::RejectedDensity { .. } | Self::RejectedWitness { .. })
    }
}

/// Peer behaviour driven by the overlay, one call per phase per round.
pub trait GuardedGossip {
    fn identity(&self) -> &PeerIdentity;

    fn id(&self) -> Identifier {
        self.identity().id
    }

    fn is_honest(&self) -> bool;

    /// The finger table this peer discloses when asked.
    fn finger_table(&self) -> &FingerTable;

    /// Identifiers that passed verification.
    fn guarded(&self) -> &BTreeSet<Identifier>;

    /// Candidates heard about but not yet verified.
    fn gossiped(&self) -> &BTreeSet<Identifier>;

    /// Identifiers this peer pushes gossip to this round.
    fn send_gossip(&self, rng: &mut dyn RngCore) -> Vec<Identifier>;

    /// Gossip from `from` delivered during `round`.
    fn recv_gossip(&mut self, from: Identifier, round: u64);

    /// Pick the peer whose finger table to verify this round.
    /// `None` means there is nothing to verify.
    fn request_finger_table(&mut self, rng: &mut dyn RngCore) -> Option<Identifier>;

    /// Verify `presented`, admit guards on success and run set maintenance.
    fn guarded_gossip(&mut self, presented: &FingerTable, round: u64, rng: &mut dyn RngCore) -> Verdict;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_classification() {
        assert!(Verdict::Accepted { admitted: 3 }.is_admitted());
        assert!(Verdict::Bypassed { admitted: 0 }.is_admitted());
        assert!(!Verdict::Ignored.is_admitted());
        assert!(!Verdict::Ignored.is_rejected());
        assert!(Verdict::RejectedDensity { presented: 2.0, bound: 1.0 }.is_rejected());
        let witness = Verdict::RejectedWitness {
            slot: 4,
            presented: Identifier::new(9),
            witness: Identifier::new(7),
        };
        assert!(witness.is_rejected());
        assert!(!witness.is_admitted());
    }
}
