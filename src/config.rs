//! # Simulation Configuration
//!
//! [`SimConfig`] collects the construction parameters of a run (population
//! size, adversary fraction, verification toggle) together with the tunable
//! knobs of the GuardedGossip protocol. The anti-replay window and the guard
//! sample range are experimental parameters, not protocol constants.

use std::fmt;
use std::ops::RangeInclusive;

use crate::fingers::FINGER_COUNT;

// ============================================================================
// Defaults
// ============================================================================

/// Default population size.
pub const DEFAULT_PEER_COUNT: usize = 100;

/// Default share of the population controlled by the adversary.
pub const DEFAULT_ATTACKER_FRACTION: f64 = 0.2;

/// Attacker fraction the defense assumes when deriving `D_TOLERANCE`.
pub const DEFAULT_ASSUMED_ATTACKER_FRACTION: f64 = 0.1;

/// Rounds during which a witnessed sender is ignored by gossip receipt.
pub const DEFAULT_GOSSIP_WINDOW: u64 = 10;

/// Maximum length of the pending-gossip set.
pub const MAX_GOSSIPS: usize = FINGER_COUNT;

/// Maximum length of the guard set.
pub const MAX_GUARDS: usize = FINGER_COUNT;

/// Lower bound of the guard admission sample when sampling is enabled.
pub const GUARD_SAMPLE_MIN: usize = 15;

/// Upper bound on population size.
/// Identifiers are drawn from 2^32 values; beyond this size allocation
/// collisions stop being negligible and rounds become very slow.
pub const MAX_PEERS: usize = 1 << 20;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Total population N.
    pub peers: usize,
    /// Fraction of N that is adversarial; the count is truncated.
    pub attacker_fraction: f64,
    /// When false, presented finger tables are admitted without checks.
    pub verify: bool,
    /// RNG seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Fraction `f` used for `D_TOLERANCE = sqrt(1 / f)`.
    pub assumed_attacker_fraction: f64,
    /// Anti-replay window for gossip receipt, in rounds.
    pub gossip_window: u64,
    /// Capacity of the pending-gossip set.
    pub max_gossips: usize,
    /// Capacity of the guard set.
    pub max_guards: usize,
    /// Admit `k` draws (with replacement) of the presented ids, `k` uniform
    /// in this range. `None` admits every distinct presented id.
    pub guard_sample: Option<RangeInclusive<usize>>,
    /// Refill the gossip queue from already picked candidates once it drains.
    pub recycle_picked_gossip: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            peers: DEFAULT_PEER_COUNT,
            attacker_fraction: DEFAULT_ATTACKER_FRACTION,
            verify: true,
            seed: None,
            assumed_attacker_fraction: DEFAULT_ASSUMED_ATTACKER_FRACTION,
            gossip_window: DEFAULT_GOSSIP_WINDOW,
            max_gossips: MAX_GOSSIPS,
            max_guards: MAX_GUARDS,
            guard_sample: None,
            recycle_picked_gossip: false,
        }
    }
}

impl SimConfig {
    pub fn new(peers: usize, attacker_fraction: f64, verify: bool) -> Self {
        Self {
            peers,
            attacker_fraction,
            verify,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_assumed_attacker_fraction(mut self, fraction: f64) -> Self {
        self.assumed_attacker_fraction = fraction;
        self
    }

    pub fn with_gossip_window(mut self, rounds: u64) -> Self {
        self.gossip_window = rounds;
        self
    }

    pub fn with_capacities(mut self, max_gossips: usize, max_guards: usize) -> Self {
        self.max_gossips = max_gossips;
        self.max_guards = max_guards;
        self
    }

    pub fn with_guard_sample(mut self, sample: RangeInclusive<usize>) -> Self {
        self.guard_sample = Some(sample);
        self
    }

    pub fn with_recycled_gossip(mut self, recycle: bool) -> Self {
        self.recycle_picked_gossip = recycle;
        self
    }

    /// Number of adversarial peers: `floor(peers * attacker_fraction)`.
    pub fn adversary_count(&self) -> usize {
        ((self.peers as f64 * self.attacker_fraction) as usize).min(self.peers)
    }

    pub fn honest_count(&self) -> usize {
        self.peers - self.adversary_count()
    }

    /// `sqrt(1 / f)`; infinite when the assumed fraction is zero.
    pub fn d_tolerance(&self) -> f64 {
        if self.assumed_attacker_fraction <= 0.0 {
            f64::INFINITY
        } else {
            (1.0 / self.assumed_attacker_fraction).sqrt()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peers == 0 {
            return Err(ConfigError::NoPeers);
        }
        if self.peers > MAX_PEERS {
            return Err(ConfigError::TooManyPeers { peers: self.peers, max: MAX_PEERS });
        }
        check_fraction("attacker_fraction", self.attacker_fraction)?;
        check_fraction("assumed_attacker_fraction", self.assumed_attacker_fraction)?;
        if self.gossip_window == 0 {
            return Err(ConfigError::ZeroGossipWindow);
        }
        if self.max_gossips == 0 {
            return Err(ConfigError::ZeroCapacity("max_gossips"));
        }
        if self.max_guards == 0 {
            return Err(ConfigError::ZeroCapacity("max_guards"));
        }
        if let Some(sample) = &self.guard_sample {
            if *sample.start() == 0 || sample.start() > sample.end() {
                return Err(ConfigError::InvalidGuardSample {
                    min: *sample.start(),
                    max: *sample.end(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn peer_policy(&self) -> PeerPolicy {
        PeerPolicy {
            enforce_checks: self.verify,
            d_tolerance: self.d_tolerance(),
            gossip_window: self.gossip_window,
            max_gossips: self.max_gossips,
            max_guards: self.max_guards,
            guard_sample: self.guard_sample.clone(),
            recycle_picked_gossip: self.recycle_picked_gossip,
        }
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidFraction { name, value })
    }
}

/// Protocol parameters shared by every honest peer of a run.
#[derive(Clone, Debug)]
pub struct PeerPolicy {
    pub enforce_checks: bool,
    pub d_tolerance: f64,
    pub gossip_window: u64,
    pub max_gossips: usize,
    pub max_guards: usize,
    pub guard_sample: Option<RangeInclusive<usize>>,
    pub recycle_picked_gossip: bool,
}

impl Default for PeerPolicy {
    fn default() -> Self {
        SimConfig::default().peer_policy()
    }
}

/// Rejected construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The ring needs at least one peer.
    NoPeers,
    TooManyPeers { peers: usize, max: usize },
    /// A fraction outside `[0, 1]` or not finite.
    InvalidFraction { name: &'static str, value: f64 },
    ZeroCapacity(&'static str),
    ZeroGossipWindow,
    InvalidGuardSample { min: usize, max: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPeers => write!(f, "peer count must be at least 1"),
            Self::TooManyPeers { peers, max } => {
                write!(f, "peer count {} exceeds the maximum of {}", peers, max)
            }
            Self::InvalidFraction { name, value } => {
                write!(f, "{} must be within [0, 1], got {}", name, value)
            }
            Self::ZeroCapacity(name) => write!(f, "{} must be at least 1", name),
            Self::ZeroGossipWindow => write!(f, "gossip window must be at least 1 round"),
            Self::InvalidGuardSample { min, max } => {
                write!(f, "guard sample range {}..={} is empty or starts at 0", min, max)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_sane() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.verify);
        assert_eq!(config.gossip_window, 10);
        assert_eq!(config.max_gossips, FINGER_COUNT);
        assert_eq!(config.max_guards, FINGER_COUNT);
        assert!(config.guard_sample.is_none());
        assert!(!config.recycle_picked_gossip);
    }

    #[test]
    fn adversary_count_truncates() {
        assert_eq!(SimConfig::new(100, 0.3, true).adversary_count(), 30);
        assert_eq!(SimConfig::new(10, 0.25, true).adversary_count(), 2);
        assert_eq!(SimConfig::new(10, 0.0, true).adversary_count(), 0);
        assert_eq!(SimConfig::new(7, 1.0, true).adversary_count(), 7);
        assert_eq!(SimConfig::new(10, 0.25, true).honest_count(), 8);
    }

    #[test]
    fn tolerance_tightens_as_assumed_fraction_grows() {
        let loose = SimConfig::default().with_assumed_attacker_fraction(0.01);
        let tight = SimConfig::default().with_assumed_attacker_fraction(0.25);
        assert!((loose.d_tolerance() - 10.0).abs() < 1e-9);
        assert!((tight.d_tolerance() - 2.0).abs() < 1e-9);
        assert!(SimConfig::default()
            .with_assumed_attacker_fraction(0.0)
            .d_tolerance()
            .is_infinite());
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        assert_eq!(SimConfig::new(0, 0.1, true).validate(), Err(ConfigError::NoPeers));
        assert!(matches!(
            SimConfig::new(MAX_PEERS + 1, 0.1, true).validate(),
            Err(ConfigError::TooManyPeers { .. })
        ));
        assert!(matches!(
            SimConfig::new(10, 1.5, true).validate(),
            Err(ConfigError::InvalidFraction { name: "attacker_fraction", .. })
        ));
        assert!(matches!(
            SimConfig::new(10, f64::NAN, true).validate(),
            Err(ConfigError::InvalidFraction { .. })
        ));
        assert!(matches!(
            SimConfig::default().with_assumed_attacker_fraction(-0.1).validate(),
            Err(ConfigError::InvalidFraction { name: "assumed_attacker_fraction", .. })
        ));
        assert_eq!(
            SimConfig::default().with_gossip_window(0).validate(),
            Err(ConfigError::ZeroGossipWindow)
        );
        assert_eq!(
            SimConfig::default().with_capacities(0, 4).validate(),
            Err(ConfigError::ZeroCapacity("max_gossips"))
        );
        assert_eq!(
            SimConfig::default().with_guard_sample(0..=4).validate(),
            Err(ConfigError::InvalidGuardSample { min: 0, max: 4 })
        );
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = SimConfig::default().with_guard_sample(20..=15);
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn peer_policy_mirrors_config() {
        let config = SimConfig::new(50, 0.2, false)
            .with_gossip_window(4)
            .with_capacities(8, 12)
            .with_guard_sample(GUARD_SAMPLE_MIN..=MAX_GUARDS)
            .with_recycled_gossip(true);
        let policy = config.peer_policy();
        assert!(!policy.enforce_checks);
        assert_eq!(policy.gossip_window, 4);
        assert_eq!(policy.max_gossips, 8);
        assert_eq!(policy.max_guards, 12);
        assert_eq!(policy.guard_sample, Some(15..=32));
        assert!(policy.recycle_picked_gossip);
        assert!((policy.d_tolerance - config.d_tolerance()).abs() < f64::EPSILON);
    }
}
