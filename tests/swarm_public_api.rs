//! Integration tests for the public API exposed through the crate root.

use std::collections::BTreeSet;

use chordguard::{
    ConfigError, GuardedGossip, Identifier, RingSnapshot, SimConfig, Swarm, SwarmError, SwarmTelemetry,
    DEFAULT_PEER_COUNT,
};

#[test]
fn default_config_bootstraps() {
    let swarm = Swarm::new(SimConfig::default().with_seed(1)).expect("default config is valid");
    assert_eq!(swarm.len(), DEFAULT_PEER_COUNT);
    assert_eq!(swarm.honest_count() + swarm.adversary_count(), swarm.len());
    assert_eq!(swarm.round(), 0);
    assert!(swarm.config().verify);
}

#[test]
fn invalid_parameters_surface_as_errors() {
    let err = Swarm::new(SimConfig::new(0, 0.2, true)).err().expect("zero peers rejected");
    assert_eq!(err, SwarmError::Config(ConfigError::NoPeers));

    let err = Swarm::new(SimConfig::new(10, f64::NAN, true)).err().expect("NaN rejected");
    assert!(matches!(err, SwarmError::Config(ConfigError::InvalidFraction { .. })));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn lookups_by_identifier() {
    let swarm = Swarm::new(SimConfig::new(30, 0.2, true).with_seed(2)).unwrap();
    let ring = RingSnapshot::new(swarm.ids().iter().copied());
    let attack_ring = RingSnapshot::new(swarm.ids().iter().copied().filter(|id| swarm.is_adversary(*id)));
    for id in swarm.ids() {
        let peer = swarm.peer(*id).expect("member");
        assert_eq!(peer.id(), *id);
        assert_eq!(swarm.responsible_peer(*id), Some(*id));
        let expected = if peer.is_honest() { &ring } else { &attack_ring };
        assert_eq!(peer.finger_table().predecessor(), expected.predecessor(*id).unwrap());
    }
    let outsider = (0..u32::MAX)
        .map(Identifier::new)
        .find(|id| !ring.contains(id))
        .unwrap();
    assert!(swarm.peer(outsider).is_none());
    assert!(!swarm.is_adversary(outsider));
}

#[test]
fn adversary_flags_agree_with_counts() {
    let swarm = Swarm::new(SimConfig::new(40, 0.35, true).with_seed(3)).unwrap();
    let adversaries: BTreeSet<Identifier> =
        swarm.ids().iter().copied().filter(|id| swarm.is_adversary(*id)).collect();
    assert_eq!(adversaries.len(), swarm.adversary_count());
    assert!(swarm.honest_ids().iter().all(|id| !adversaries.contains(id)));
}

#[test]
fn telemetry_serializes_to_json() {
    let mut swarm = Swarm::new(SimConfig::new(20, 0.25, true).with_seed(4)).unwrap();
    swarm.run(5);
    let telemetry: SwarmTelemetry = swarm.telemetry();
    let json = serde_json::to_value(&telemetry).unwrap();
    assert_eq!(json["round"], 5);
    assert_eq!(json["peers"], 20);
    assert_eq!(json["adversaries"], 5);
    assert!(json["verification"]["accepted"].is_u64());
}

#[test]
fn unbounded_tolerance_serializes_as_null() {
    let config = SimConfig::new(10, 0.0, true).with_seed(5).with_assumed_attacker_fraction(0.0);
    let swarm = Swarm::new(config).unwrap();
    let json = serde_json::to_value(swarm.telemetry()).unwrap();
    assert!(json["d_tolerance"].is_null());
}

#[test]
fn ring_dump_has_one_line_per_peer() {
    let swarm = Swarm::new(SimConfig::new(8, 0.25, true).with_seed(6)).unwrap();
    let dump = swarm.to_string();
    assert_eq!(dump.lines().count(), 8);
    for (line, id) in dump.lines().zip(swarm.ids()) {
        assert!(line.contains(&format!("id: {}", id)));
    }
}
