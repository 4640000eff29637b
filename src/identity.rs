//! # Peer Identities
//!
//! Every simulated peer receives a ring [`Identifier`] drawn uniformly from
//! the identifier space and a synthetic IPv4 address. Nothing in the protocol
//! reads the address; it is carried for reports and log output.
//!
//! Uniform generation alone does not guarantee uniqueness, so identities are
//! handed out through an [`IdentityAllocator`] that redraws on collision
//! before an identity is ever inserted into the population.

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use rand::Rng;
use tracing::trace;

use crate::ring::Identifier;

/// Redraw budget per allocation before giving up.
/// A collision needs two equal 32-bit draws, so this bound is only reached
/// when the population approaches the size of the ring.
const MAX_ALLOCATION_ATTEMPTS: u32 = 64;

/// Ring identifier plus synthetic network address of a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerIdentity {
    pub id: Identifier,
    pub addr: Ipv4Addr,
}

impl PeerIdentity {
    pub fn new(id: Identifier, addr: Ipv4Addr) -> Self {
        Self { id, addr }
    }

    /// Draw a uniformly random identifier and address.
    /// No uniqueness check; use [`IdentityAllocator::allocate`] for that.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = Identifier::new(rng.gen());
        let addr = Ipv4Addr::from(rng.gen::<u32>());
        Self { id, addr }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.addr)
    }
}

/// Error returned when no free identifier could be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationError {
    /// Identities handed out before the failure.
    pub allocated: usize,
    /// Draws attempted for the failing allocation.
    pub attempts: u32,
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no free ring identifier after {} draws ({} identities already allocated)",
            self.attempts, self.allocated
        )
    }
}

impl std::error::Error for AllocationError {}

/// Hands out identities whose ring identifiers are unique.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    taken: BTreeSet<Identifier>,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<PeerIdentity, AllocationError> {
        for attempt in 0..MAX_ALLOCATION_ATTEMPTS {
            let identity = PeerIdentity::random(rng);
            if self.taken.insert(identity.id) {
                return Ok(identity);
            }
            trace!(id = %identity.id, attempt, "identifier collision, redrawing");
        }
        Err(AllocationError {
            allocated: self.taken.len(),
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.taken.contains(id)
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}
