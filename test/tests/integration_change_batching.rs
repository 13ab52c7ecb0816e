/// Integration tests for outbound change batching and echo suppression
///
/// Local edits are coalesced into one flush per feature per frame, and values
/// replayed from the network are never reported back out.

use roadsync_shared::{FeatureKind, FeatureTarget, FeatureValue, IgnoreScope, PeerId, SyncMessage};
use roadsync_test::Session;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn batches_to(session: &Session, peer: PeerId) -> Vec<(FeatureKind, usize)> {
    session
        .hub
        .deliveries_to(peer)
        .into_iter()
        .filter_map(|delivery| match delivery.message {
            SyncMessage::BatchApplied(batch) => Some((batch.feature, batch.entries.len())),
            _ => None,
        })
        .collect()
}

fn set_requests_from(session: &Session, peer: PeerId) -> usize {
    session
        .hub
        .deliveries_to(PeerId::HOST)
        .iter()
        .filter(|delivery| delivery.from == peer && matches!(delivery.message, SyncMessage::SetRequest(_)))
        .count()
}

/// A burst of host edits in one frame leaves as one batch per feature
#[test]
fn host_burst_is_one_batch_per_feature() {
    init_logging();
    let mut session = Session::standard(1);
    session.hub.clear_log();

    for sub_index in 0..3 {
        let lane = session.host_sim().lane_target(10, sub_index).unwrap();
        session
            .host_sim_mut()
            .user_edit(lane, FeatureValue::SpeedLimit(Some(60)))
            .unwrap();
    }
    session
        .host_sim_mut()
        .user_edit(FeatureTarget::Node { node: 3 }, FeatureValue::TrafficLight(true))
        .unwrap();
    session.pump();

    let mut batches = batches_to(&session, PeerId(1));
    batches.sort();
    assert_eq!(
        batches,
        vec![(FeatureKind::SpeedLimit, 3), (FeatureKind::TrafficLight, 1)]
    );
}

/// Values replayed on a peer do not turn into requests or further broadcasts
#[test]
fn replayed_values_are_not_echoed() {
    init_logging();
    let mut session = Session::standard(2);
    session.hub.clear_log();

    let lane = session.host_sim().lane_target(11, 0).unwrap();
    session
        .host_sim_mut()
        .user_edit(lane, FeatureValue::LaneArrows(4))
        .unwrap();
    for _ in 0..5 {
        session.tick();
    }

    for peer in &session.peers {
        assert_eq!(peer.engine.observer().pending(), 0);
        assert_eq!(set_requests_from(&session, peer.id()), 0);
        let local = peer.sim().lane_target(11, 0).unwrap();
        assert_eq!(peer.sim().value(FeatureKind::LaneArrows, &local), Some(FeatureValue::LaneArrows(4)));
    }
    assert_eq!(batches_to(&session, PeerId(1)), vec![(FeatureKind::LaneArrows, 1)]);
}

/// A peer's own edits are all requested in the frame they were made
#[test]
fn peer_burst_is_flushed_once() {
    init_logging();
    let mut session = Session::standard(1);
    let peer = PeerId(1);
    session.hub.clear_log();

    for sub_index in 0..2 {
        let lane = session.peer(peer).sim().lane_target(11, sub_index).unwrap();
        session
            .peer_mut(peer)
            .sim_mut()
            .user_edit(lane, FeatureValue::SpeedLimit(Some(30)))
            .unwrap();
    }
    assert_eq!(session.peer(peer).engine.observer().pending(), 2);
    assert_eq!(session.peer(peer).queue.len(), 1);

    session.pump();

    assert_eq!(session.peer(peer).engine.observer().pending(), 0);
    assert_eq!(set_requests_from(&session, peer), 2);
}

/// Changes observed inside an ignore scope are dropped
#[test]
fn ignore_scope_suppresses_observation() {
    init_logging();
    let mut session = Session::standard(1);
    let lane = session.host_sim().lane_target(10, 1).unwrap();

    {
        let _scope = IgnoreScope::enter();
        assert!(!session.host.on_local_change(lane, FeatureValue::SpeedLimit(Some(20))));
    }
    assert!(session.host.on_local_change(lane, FeatureValue::SpeedLimit(Some(20))));
    assert_eq!(session.host.observer().pending(), 1);
}

/// A stopped host drops what its simulation reports instead of broadcasting it
#[test]
fn stopped_host_drops_observed_changes() {
    init_logging();
    let mut session = Session::standard(1);
    session.host.stop();
    session.hub.clear_log();

    session
        .host_sim_mut()
        .user_edit(FeatureTarget::Node { node: 1 }, FeatureValue::TrafficLight(false))
        .unwrap();
    session.pump();

    assert!(batches_to(&session, PeerId(1)).is_empty());
}
