/// Integration tests for out-of-order delivery
///
/// Applied records can reach a peer before the mapping they depend on, or
/// before the peer's simulation has created the entity. They must wait and
/// then apply exactly once, or be dropped when the entity is gone for good.

use roadsync_shared::{
    Applied, FeatureKind, FeatureTarget, FeatureValue, LaneRef, LaneSet, PeerId, SyncConfig, SyncMessage,
};
use roadsync_test::{Session, HOST_FIRST_LANE};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// host lanes of a segment added after the standard layout
const SEGMENT_12_FIRST_LANE: u32 = HOST_FIRST_LANE + 5;

fn add_segment_12_on_host(session: &mut Session) {
    session.host_sim_mut().add_segment(12, 2);
    session.host.observe_parent(12);
}

/// An Applied stamped with a newer mapping version waits for that version
#[test]
fn applied_waits_for_mapping_version() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    session.peer_mut(peer).sim_mut().add_segment(12, 2);
    session.host_sim_mut().add_segment(12, 2);
    let required = session.host.world().mapping().current_version().unwrap() + 2;

    let early = Applied::new(
        FeatureTarget::lane(SEGMENT_12_FIRST_LANE, 12, 0),
        FeatureValue::SpeedLimit(Some(30)),
        Some(required),
    );
    session
        .peer_mut(peer)
        .engine
        .handle_message(PeerId::HOST, SyncMessage::Applied(early));
    assert_eq!(session.peer(peer).engine.deferred_len(), 1);

    session.host.observe_parent(12);
    session.pump();

    let local = session.peer(peer).sim().lane_target(12, 0).unwrap();
    assert_eq!(
        session.peer(peer).sim().value(FeatureKind::SpeedLimit, &local),
        Some(FeatureValue::SpeedLimit(Some(30)))
    );
    assert_eq!(session.peer(peer).engine.deferred_len(), 0);
    assert_eq!(
        session.peer(peer).engine.world().mapping().current_version().unwrap(),
        required
    );
}

/// A lane the peer has not loaded yet is applied as soon as it appears locally
#[test]
fn applied_waits_for_local_entity() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    add_segment_12_on_host(&mut session);
    session.pump();

    let host_lane = session.host_sim().lane_target(12, 1).unwrap();
    session
        .host_sim_mut()
        .user_edit(host_lane, FeatureValue::SpeedLimit(Some(40)))
        .unwrap();
    session.pump();
    assert_eq!(session.peer(peer).engine.deferred_len(), 1);

    session.peer_mut(peer).sim_mut().add_segment(12, 2);
    session.tick();

    let local = session.peer(peer).sim().lane_target(12, 1).unwrap();
    assert_eq!(
        session.peer(peer).sim().value(FeatureKind::SpeedLimit, &local),
        Some(FeatureValue::SpeedLimit(Some(40)))
    );
    assert_eq!(session.peer(peer).engine.deferred_len(), 0);
}

/// Lane connections wait for every connected lane, not just the source lane
#[test]
fn lane_connections_wait_for_connected_lane() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    add_segment_12_on_host(&mut session);
    session.pump();

    let source = session.host_sim().lane_target(10, 0).unwrap();
    let connected = LaneSet::from_lanes([LaneRef::new(SEGMENT_12_FIRST_LANE + 1, 12, 1)]).unwrap();
    session
        .host_sim_mut()
        .user_edit(source, FeatureValue::LaneConnections(connected))
        .unwrap();
    session.pump();
    assert_eq!(session.peer(peer).engine.deferred_len(), 1);

    session.peer_mut(peer).sim_mut().add_segment(12, 2);
    session.tick();

    let joined = session.peer(peer).sim();
    let local = joined.lane_target(10, 0).unwrap();
    let expected = LaneSet::from_lanes([LaneRef::new(joined.lane_handle(12, 1).unwrap(), 12, 1)]).unwrap();
    assert_eq!(
        joined.value(FeatureKind::LaneConnections, &local),
        Some(FeatureValue::LaneConnections(expected))
    );
    assert_eq!(session.peer(peer).engine.deferred_len(), 0);
}

/// Only the latest value for a target survives while it waits
#[test]
fn latest_waiting_value_wins() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    add_segment_12_on_host(&mut session);
    session.pump();

    let host_lane = session.host_sim().lane_target(12, 0).unwrap();
    for kmh in [30, 60, 90] {
        session
            .host_sim_mut()
            .user_edit(host_lane, FeatureValue::SpeedLimit(Some(kmh)))
            .unwrap();
        session.pump();
    }
    assert_eq!(session.peer(peer).engine.deferred_len(), 1);

    session.peer_mut(peer).sim_mut().add_segment(12, 2);
    session.tick();

    let local = session.peer(peer).sim().lane_target(12, 0).unwrap();
    assert_eq!(
        session.peer(peer).sim().value(FeatureKind::SpeedLimit, &local),
        Some(FeatureValue::SpeedLimit(Some(90)))
    );
}

/// A waiting record whose entity is released on the host is dropped
#[test]
fn waiting_record_dropped_when_entity_released() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    add_segment_12_on_host(&mut session);
    session.pump();

    let host_lane = session.host_sim().lane_target(12, 0).unwrap();
    session
        .host_sim_mut()
        .user_edit(host_lane, FeatureValue::LaneArrows(1))
        .unwrap();
    session.pump();
    assert_eq!(session.peer(peer).engine.deferred_len(), 1);

    session.host_sim_mut().remove_segment(12);
    session.host.on_parent_released(12);
    session.pump();

    assert_eq!(session.peer(peer).engine.deferred_len(), 0);
    assert!(session
        .peer(peer)
        .engine
        .world()
        .mapping()
        .entries_for_parent(12)
        .unwrap()
        .is_empty());
}

/// Records wait while the peer's simulation is still loading
#[test]
fn applied_waits_for_adapter_ready() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    session.peer_mut(peer).sim_mut().set_ready(false);

    session
        .host_sim_mut()
        .user_edit(FeatureTarget::Node { node: 2 }, FeatureValue::TrafficLight(true))
        .unwrap();
    session.pump();
    assert_eq!(session.peer(peer).engine.deferred_len(), 1);

    session.peer_mut(peer).sim_mut().set_ready(true);
    session.tick();

    assert_eq!(
        session
            .peer(peer)
            .sim()
            .value(FeatureKind::TrafficLight, &FeatureTarget::Node { node: 2 }),
        Some(FeatureValue::TrafficLight(true))
    );
}

/// With a pass limit configured, records that never become applicable expire
#[test]
fn waiting_record_expires_after_pass_limit() {
    init_logging();
    let config = SyncConfig {
        deferred_max_wait_passes: Some(3),
        ..SyncConfig::default()
    };
    let mut session = Session::with_config(config, 1);
    let peer = PeerId(1);
    add_segment_12_on_host(&mut session);
    session.pump();

    let host_lane = session.host_sim().lane_target(12, 0).unwrap();
    session
        .host_sim_mut()
        .user_edit(host_lane, FeatureValue::SpeedLimit(Some(70)))
        .unwrap();
    session.pump();
    for _ in 0..4 {
        session.tick();
    }

    assert_eq!(session.peer(peer).engine.deferred_len(), 0);
}
