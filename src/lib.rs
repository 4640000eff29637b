//! # ChordGuard - Sybil-Resistant Finger Tables on a Chord Ring
//!
//! ChordGuard simulates a pre-stabilized Chord overlay in which a fraction of
//! the population colludes to poison routing state, and measures how well the
//! GuardedGossip defense keeps honest peers from trusting colluders.
//!
//! - **Ring**: 32-bit modular identifier space with explicit `add`/`sub`
//! - **Topology**: finger tables built once from a frozen ring snapshot
//! - **Gossip**: honest peers push their finger-table view every round
//! - **Verification**: density bound and witness-list checks gate admission to
//!   each peer's guard set
//! - **Adversaries**: colluders disclose an attack ring built only from their
//!   own pool
//!
//! ## Round Model
//!
//! The [`Swarm`] drives discrete rounds. Each round every peer first gossips,
//! then every peer verifies one finger table. The outcome is a single metric:
//! the mean fraction of adversarial identifiers in honest guard sets.
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|--------|
//! | `ring` | Identifier type and modular arithmetic |
//! | `identity` | Unique identifier and address allocation |
//! | `config` | Construction parameters, protocol knobs, validation |
//! | `fingers` | Finger tables, ideal finger ids, density |
//! | `topology` | Sorted ring snapshot and finger-table construction |
//! | `protocols` | The `GuardedGossip` trait and verification verdicts |
//! | `peer` | Honest peer: gossip buffer, witnesses, guard set |
//! | `adversary` | Colluding peer sharing the adversary pool |
//! | `swarm` | Overlay driver, round loop, metric and telemetry |

mod adversary;
mod config;
mod fingers;
mod identity;
mod peer;
mod protocols;
mod ring;
mod swarm;
mod topology;

pub use adversary::AdversaryPeer;
pub use config::{
    ConfigError, PeerPolicy, SimConfig, DEFAULT_ASSUMED_ATTACKER_FRACTION, DEFAULT_ATTACKER_FRACTION,
    DEFAULT_GOSSIP_WINDOW, DEFAULT_PEER_COUNT, GUARD_SAMPLE_MIN, MAX_GOSSIPS, MAX_GUARDS, MAX_PEERS,
};
pub use fingers::{density, ideal_finger_ids, Finger, FingerTable, FINGER_COUNT};
pub use identity::{AllocationError, IdentityAllocator, PeerIdentity};
pub use peer::HonestPeer;
pub use protocols::{GuardedGossip, Verdict};
pub use ring::{add, finger_offset, in_interval, sub, wrapped_distance, Identifier, RingError, RING_BITS, RING_SIZE};
pub use swarm::{Swarm, SwarmError, SwarmTelemetry, VerificationStats};
pub use topology::RingSnapshot;
