//! # Overlay Driver
//!
//! [`Swarm`] owns the whole simulated population and performs every
//! "online" interaction on behalf of the peers, ignoring latency. The ring is
//! assumed to be bootstrapped and stabilized: identities are allocated and
//! finger tables built once in [`Swarm::new`], and membership never changes
//! afterwards.
//!
//! ## Round Structure
//!
//! ```text
//! step():
//!   round += 1
//!   gossip phase        every peer's send-list is delivered to recv_gossip
//!   verification phase  every peer requests one finger table and verifies it
//! ```
//!
//! The gossip phase completes before verification starts, so verification
//! always observes the gossip state of the current round. Finger tables are
//! never mutated during a round, so a disclosed table is a plain read of the
//! target's current table.
//!
//! ## Metric
//!
//! [`Swarm::metric`] averages, over honest peers with a non-empty guard set,
//! the fraction of guarded identifiers owned by adversaries. Peers without
//! guards are excluded rather than counted as zero.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::adversary::AdversaryPeer;
use crate::config::{ConfigError, SimConfig};
use crate::identity::{AllocationError, IdentityAllocator, PeerIdentity};
use crate::peer::HonestPeer;
use crate::protocols::{GuardedGossip, Verdict};
use crate::ring::Identifier;
use crate::topology::RingSnapshot;

/// Cumulative verification outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerificationStats {
    pub accepted: u64,
    pub bypassed: u64,
    pub rejected_density: u64,
    pub rejected_witness: u64,
    pub ignored: u64,
    /// Verification attempts with no usable target.
    pub skipped: u64,
}

impl VerificationStats {
    fn record(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Accepted { .. } => self.accepted += 1,
            Verdict::Bypassed { .. } => self.bypassed += 1,
            Verdict::RejectedDensity { .. } => self.rejected_density += 1,
            Verdict::RejectedWitness { .. } => self.rejected_witness += 1,
            Verdict::Ignored => self.ignored += 1,
        }
    }

    fn merge(&mut self, other: &VerificationStats) {
        self.accepted += other.accepted;
        self.bypassed += other.bypassed;
        self.rejected_density += other.rejected_density;
        self.rejected_witness += other.rejected_witness;
        self.ignored += other.ignored;
        self.skipped += other.skipped;
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_density + self.rejected_witness
    }

    pub fn admitted(&self) -> u64 {
        self.accepted + self.bypassed
    }
}

/// Point-in-time view of a run, suitable for reports.
#[derive(Clone, Debug, Serialize)]
pub struct SwarmTelemetry {
    pub round: u64,
    pub peers: usize,
    pub honest: usize,
    pub adversaries: usize,
    pub verify: bool,
    pub d_tolerance: f64,
    /// Attacker-presence metric in `[0, 1]`.
    pub metric: f64,
    /// Honest peers with at least one guard.
    pub contributing_peers: usize,
    pub mean_guard_size: f64,
    pub verification: VerificationStats,
}

/// Error raised while bootstrapping a swarm.
#[derive(Debug, Clone, PartialEq)]
pub enum SwarmError {
    Config(ConfigError),
    Identity(AllocationError),
    /// A finger table was requested from an empty ring.
    EmptyRing,
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
            Self::Identity(e) => write!(f, "identity allocation failed: {}", e),
            Self::EmptyRing => write!(f, "cannot build finger tables on an empty ring"),
        }
    }
}

impl std::error::Error for SwarmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Identity(e) => Some(e),
            Self::EmptyRing => None,
        }
    }
}

impl From<ConfigError> for SwarmError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<AllocationError> for SwarmError {
    fn from(e: AllocationError) -> Self {
        Self::Identity(e)
    }
}

pub struct Swarm {
    config: SimConfig,
    /// Sorted by identifier; `peers[i].id() == ring.ids()[i]`.
    peers: Vec<Box<dyn GuardedGossip>>,
    ring: RingSnapshot,
    honest_ids: Vec<Identifier>,
    adversary_count: usize,
    round: u64,
    rng: StdRng,
    stats: VerificationStats,
}

impl Swarm {
    /// Allocate the population and bootstrap every finger table.
    ///
    /// Adversaries are wired to the attack ring built from the colluding pool;
    /// honest peers are wired to the full ring.
    pub fn new(config: SimConfig) -> Result<Self, SwarmError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut allocator = IdentityAllocator::new();
        let adversaries = (0..config.adversary_count())
            .map(|_| allocator.allocate(&mut rng))
            .collect::<Result<Vec<PeerIdentity>, _>>()?;
        let honest = (0..config.honest_count())
            .map(|_| allocator.allocate(&mut rng))
            .collect::<Result<Vec<PeerIdentity>, _>>()?;

        let ring = RingSnapshot::new(adversaries.iter().chain(honest.iter()).map(|p| p.id));
        let attack_ring = RingSnapshot::new(adversaries.iter().map(|p| p.id));
        let pool: Arc<[Identifier]> = attack_ring.ids().into();
        let policy = Arc::new(config.peer_policy());

        let mut peers: Vec<Box<dyn GuardedGossip>> = Vec::with_capacity(ring.len());
        for identity in &adversaries {
            let table = attack_ring.finger_table(identity.id).ok_or(SwarmError::EmptyRing)?;
            peers.push(Box::new(AdversaryPeer::new(*identity, table, Arc::clone(&pool))));
        }
        let mut honest_ids = Vec::with_capacity(honest.len());
        for identity in &honest {
            let table = ring.finger_table(identity.id).ok_or(SwarmError::EmptyRing)?;
            peers.push(Box::new(HonestPeer::new(*identity, table, Arc::clone(&policy))));
            honest_ids.push(identity.id);
        }
        peers.sort_by_key(|peer| peer.id());
        honest_ids.sort_unstable();

        info!(
            peers = peers.len(),
            honest = honest_ids.len(),
            adversaries = adversaries.len(),
            verify = config.verify,
            d_tolerance = config.d_tolerance(),
            seed = ?config.seed,
            "swarm bootstrapped"
        );

        Ok(Self {
            config,
            peers,
            ring,
            honest_ids,
            adversary_count: adversaries.len(),
            round: 0,
            rng,
            stats: VerificationStats::default(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn honest_count(&self) -> usize {
        self.honest_ids.len()
    }

    pub fn adversary_count(&self) -> usize {
        self.adversary_count
    }

    /// Every member identifier, ascending.
    pub fn ids(&self) -> &[Identifier] {
        self.ring.ids()
    }

    pub fn honest_ids(&self) -> &[Identifier] {
        &self.honest_ids
    }

    pub fn peer(&self, id: Identifier) -> Option<&dyn GuardedGossip> {
        self.index_of(id).map(|index| &*self.peers[index])
    }

    pub fn peers(&self) -> impl Iterator<Item = &dyn GuardedGossip> + '_ {
        self.peers.iter().map(|peer| &**peer)
    }

    pub fn is_adversary(&self, id: Identifier) -> bool {
        self.peer(id).is_some_and(|peer| !peer.is_honest())
    }

    /// Member responsible for `key` on the full ring.
    pub fn responsible_peer(&self, key: Identifier) -> Option<Identifier> {
        self.ring.successor(key)
    }

    /// Uniformly random member.
    pub fn pick(&mut self) -> Option<&dyn GuardedGossip> {
        self.peers.choose(&mut self.rng).map(|peer| &**peer)
    }

    /// Uniformly random honest member.
    pub fn pick_honest(&mut self) -> Option<Identifier> {
        self.honest_ids.choose(&mut self.rng).copied()
    }

    pub fn stats(&self) -> &VerificationStats {
        &self.stats
    }

    /// Advance exactly one round.
    pub fn step(&mut self) {
        self.round += 1;
        self.gossip_phase();
        let round_stats = self.verification_phase();
        self.stats.merge(&round_stats);
        debug!(
            round = self.round,
            admitted = round_stats.admitted(),
            rejected_density = round_stats.rejected_density,
            rejected_witness = round_stats.rejected_witness,
            skipped = round_stats.skipped,
            "round complete"
        );
    }

    pub fn run(&mut self, rounds: u64) {
        for _ in 0..rounds {
            self.step();
        }
    }

    fn index_of(&self, id: Identifier) -> Option<usize> {
        self.ring.ids().binary_search(&id).ok()
    }

    fn gossip_phase(&mut self) {
        let round = self.round;
        let mut deliveries = 0usize;
        for source in 0..self.peers.len() {
            let from = self.peers[source].id();
            let targets = self.peers[source].send_gossip(&mut self.rng);
            for target in targets {
                match self.index_of(target) {
                    Some(index) => {
                        self.peers[index].recv_gossip(from, round);
                        deliveries += 1;
                    }
                    None => warn!(from = %from, target = %target, "gossip addressed to unknown peer"),
                }
            }
        }
        trace!(round, deliveries, "gossip phase complete");
    }

    fn verification_phase(&mut self) -> VerificationStats {
        let round = self.round;
        let mut stats = VerificationStats::default();
        for requester in 0..self.peers.len() {
            let Some(target) = self.peers[requester].request_finger_table(&mut self.rng) else {
                stats.skipped += 1;
                continue;
            };
            let Some(index) = self.index_of(target) else {
                warn!(
                    requester = %self.peers[requester].id(),
                    target = %target,
                    "verification target is not a member"
                );
                stats.skipped += 1;
                continue;
            };
            let presented = self.peers[index].finger_table().clone();
            let verdict = self.peers[requester].guarded_gossip(&presented, round, &mut self.rng);
            stats.record(&verdict);
        }
        stats
    }

    fn guard_fractions(&self) -> impl Iterator<Item = f64> + '_ {
        self.peers
            .iter()
            .filter(|peer| peer.is_honest() && !peer.guarded().is_empty())
            .map(|peer| {
                let guarded = peer.guarded();
                let adversarial = guarded.iter().filter(|id| self.is_adversary(**id)).count();
                adversarial as f64 / guarded.len() as f64
            })
    }

    /// Mean fraction of adversarial guards over honest peers that have any.
    /// Zero when no honest peer has a guard yet.
    pub fn metric(&self) -> f64 {
        let (sum, count) = self
            .guard_fractions()
            .fold((0.0, 0usize), |(sum, count), fraction| (sum + fraction, count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    pub fn telemetry(&self) -> SwarmTelemetry {
        let guard_sizes: Vec<usize> = self
            .peers
            .iter()
            .filter(|peer| peer.is_honest() && !peer.guarded().is_empty())
            .map(|peer| peer.guarded().len())
            .collect();
        let mean_guard_size = if guard_sizes.is_empty() {
            0.0
        } else {
            guard_sizes.iter().sum::<usize>() as f64 / guard_sizes.len() as f64
        };
        SwarmTelemetry {
            round: self.round,
            peers: self.len(),
            honest: self.honest_count(),
            adversaries: self.adversary_count(),
            verify: self.config.verify,
            d_tolerance: self.config.d_tolerance(),
            metric: self.metric(),
            contributing_peers: guard_sizes.len(),
            mean_guard_size,
            verification: self.stats,
        }
    }
}

impl fmt::Display for Swarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for peer in &self.peers {
            let table = peer.finger_table();
            writeln!(
                f,
                "{} -> pred: {}, id: {}, succ: {}, honest: {}",
                peer.identity().addr,
                table.predecessor(),
                peer.id(),
                table.successor(),
                peer.is_honest()
            )?;
        }
        Ok(())
    }
}
