/// Integration tests for full-state export
///
/// Peers that join late, or ask for a resync, receive the mapping followed by
/// every feature's state. Broadcast exports are rate limited.

use std::time::Duration;

use roadsync_server::{
    DispatchRoute, ExportOutcome, ExportReason, HostEvent, SnapshotDispatcher, SnapshotProvider, EXPORT_CHUNK,
};
use roadsync_shared::{
    EditTarget, EntityRef, FeatureKind, FeatureTarget, FeatureValue, LaneRef, LaneSet, PeerId, SyncError,
    SyncMessage, SyncWorld,
};
use roadsync_test::{Session, SimWorld};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A peer joining after edits were made catches up on all of them
#[test]
fn late_joiner_receives_current_state() {
    init_logging();
    let mut session = Session::standard(1);
    let host_lane = session.host_sim().lane_target(11, 1).unwrap();
    session
        .host_sim_mut()
        .user_edit(host_lane, FeatureValue::SpeedLimit(Some(80)))
        .unwrap();
    session
        .host_sim_mut()
        .user_edit(FeatureTarget::Node { node: 1 }, FeatureValue::TrafficLight(true))
        .unwrap();
    session.pump();

    let late = session.join_peer(SimWorld::standard(2000));
    session.pump();

    let first = session.hub.deliveries_to(late).into_iter().next().unwrap();
    assert!(matches!(first.message, SyncMessage::MappingBatch(batch) if batch.is_full_snapshot));

    let joined = session.peer(late);
    let local = joined.sim().lane_target(11, 1).unwrap();
    assert_eq!(
        joined.sim().value(FeatureKind::SpeedLimit, &local),
        Some(FeatureValue::SpeedLimit(Some(80)))
    );
    assert_eq!(
        joined
            .sim()
            .value(FeatureKind::TrafficLight, &FeatureTarget::Node { node: 1 }),
        Some(FeatureValue::TrafficLight(true))
    );
}

/// Lane connections reach a late joiner in the joiner's own lane handles
#[test]
fn late_joiner_receives_lane_connections() {
    init_logging();
    let mut session = Session::standard(1);
    let source = session.host_sim().lane_target(10, 1).unwrap();
    let connected = LaneSet::from_lanes([LaneRef::new(session.host_sim().lane_handle(11, 0).unwrap(), 11, 0)]).unwrap();
    session
        .host_sim_mut()
        .user_edit(source, FeatureValue::LaneConnections(connected))
        .unwrap();
    session.pump();

    let late = session.join_peer(SimWorld::standard(2000));
    session.pump();

    let joined = session.peer(late).sim();
    let local = joined.lane_target(10, 1).unwrap();
    let expected = LaneSet::from_lanes([LaneRef::new(joined.lane_handle(11, 0).unwrap(), 11, 0)]).unwrap();
    assert_eq!(
        joined.value(FeatureKind::LaneConnections, &local),
        Some(FeatureValue::LaneConnections(expected))
    );
}

// dispatches a lock-cleared record for one node
struct NodeRecord(u32);

impl SnapshotProvider<SimWorld> for NodeRecord {
    fn name(&self) -> &str {
        if self.0 == 1 {
            "first"
        } else {
            "last"
        }
    }

    fn export(&self, _world: &SyncWorld<SimWorld>, route: &mut DispatchRoute<'_>) -> Result<(), SyncError> {
        route.dispatch(SyncMessage::EditLockCleared(EditTarget::new(EntityRef::node(self.0))));
        Ok(())
    }
}

struct Broken;

impl SnapshotProvider<SimWorld> for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn export(&self, _world: &SyncWorld<SimWorld>, _route: &mut DispatchRoute<'_>) -> Result<(), SyncError> {
        Err(SyncError::InvalidPayload {
            reason: "unreadable state".to_string(),
        })
    }
}

/// A failing provider is counted and skipped; the providers after it still run, in order
#[test]
fn failing_provider_does_not_stop_export() {
    init_logging();
    let session = Session::standard(1);
    let mut dispatcher = SnapshotDispatcher::<SimWorld>::new(Duration::ZERO);
    dispatcher.register_provider(Box::new(NodeRecord(1)));
    dispatcher.register_provider(Box::new(Broken));
    dispatcher.register_provider(Box::new(NodeRecord(2)));
    assert_eq!(dispatcher.provider_names(), vec!["first", "broken", "last"]);
    session.hub.clear_log();

    let outcome = dispatcher.try_export_for_peer(
        true,
        session.host.world(),
        &*session.hub.host_link(),
        PeerId(1),
        ExportReason::PeerJoined,
    );

    assert_eq!(
        outcome,
        ExportOutcome::Exported {
            target: Some(PeerId(1)),
            messages: 2,
            failed_providers: 1,
        }
    );
    let cleared: Vec<EntityRef> = session
        .hub
        .deliveries_to(PeerId(1))
        .into_iter()
        .filter_map(|delivery| match delivery.message {
            SyncMessage::EditLockCleared(cleared) => Some(cleared.target),
            _ => None,
        })
        .collect();
    assert_eq!(cleared, vec![EntityRef::node(1), EntityRef::node(2)]);
}

/// A join snapshot goes to the joiner only
#[test]
fn join_snapshot_is_targeted() {
    init_logging();
    let mut session = Session::standard(1);
    session.hub.clear_log();

    let late = session.join_peer(SimWorld::standard(2000));
    session.pump();

    assert!(!session.hub.deliveries_to(late).is_empty());
    assert!(session.hub.deliveries_to(PeerId(1)).is_empty());
    let events = session.host.take_events();
    assert!(events.iter().any(|event| matches!(
        event,
        HostEvent::SnapshotExported(ExportOutcome::Exported { target: Some(peer), .. }) if *peer == late
    )));
}

/// Broadcast resyncs are spaced by the configured interval
#[test]
fn resync_is_rate_limited() {
    init_logging();
    let mut session = Session::standard(1);

    assert_eq!(session.host.request_resync(session.now), ExportOutcome::RateLimited);

    let later = session.now + Duration::from_secs(1);
    assert!(matches!(
        session.host.request_resync(later),
        ExportOutcome::Exported { target: None, .. }
    ));
    assert_eq!(session.host.request_resync(later), ExportOutcome::RateLimited);
}

/// Becoming the host always exports, whatever the last broadcast
#[test]
fn role_change_bypasses_rate_limit() {
    init_logging();
    let mut session = Session::standard(1);
    session.host.stop();
    session.host.take_events();

    session.host.start(session.now);

    let events = session.host.take_events();
    assert!(matches!(
        events.as_slice(),
        [HostEvent::SnapshotExported(ExportOutcome::Exported { target: None, .. })]
    ));
}

/// Nothing is exported while the simulation is loading or the host is stopped
#[test]
fn export_skipped_when_not_ready_or_not_host() {
    init_logging();
    let mut session = Session::standard(1);

    session.host_sim_mut().set_ready(false);
    assert_eq!(session.host.on_peer_joined(PeerId(1)), ExportOutcome::SkippedNotReady);

    session.host_sim_mut().set_ready(true);
    session.host.stop();
    let later = session.now + Duration::from_secs(5);
    assert_eq!(session.host.request_resync(later), ExportOutcome::SkippedNotHost);
}

/// Large feature exports are split into several batches
#[test]
fn large_export_is_chunked() {
    init_logging();
    let mut session = Session::standard(0);
    session.host_sim_mut().add_segment(20, 200);
    session.host_sim_mut().add_segment(21, 200);
    session.host.observe_parent(20);
    session.host.observe_parent(21);
    for segment in [20, 21] {
        for sub_index in 0..200 {
            let lane = session.host_sim().lane_target(segment, sub_index).unwrap();
            session
                .host_sim_mut()
                .user_edit(lane, FeatureValue::LaneArrows(2))
                .unwrap();
        }
    }
    session.pump();

    let mut world = SimWorld::standard(5000);
    world.add_segment(20, 200);
    world.add_segment(21, 200);
    let late = session.join_peer(world);
    session.pump();

    let batches: Vec<usize> = session
        .hub
        .deliveries_to(late)
        .into_iter()
        .filter_map(|delivery| match delivery.message {
            SyncMessage::BatchApplied(batch) if batch.feature == FeatureKind::LaneArrows => {
                Some(batch.entries.len())
            }
            _ => None,
        })
        .collect();
    assert_eq!(batches, vec![EXPORT_CHUNK, 400 - EXPORT_CHUNK]);

    let joined = session.peer(late);
    let last = joined.sim().lane_target(21, 199).unwrap();
    assert_eq!(
        joined.sim().value(FeatureKind::LaneArrows, &last),
        Some(FeatureValue::LaneArrows(2))
    );
}
