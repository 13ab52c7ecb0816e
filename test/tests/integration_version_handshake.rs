/// Integration tests for the protocol version handshake
///
/// Every peer announces its record set version when it joins. The host answers
/// the announcing peer alone; a mismatch is reported on both sides.

use roadsync_client::PeerEvent;
use roadsync_server::HostEvent;
use roadsync_shared::{PeerId, SyncConfig, SyncMessage, VersionCheck, PROTOCOL_VERSION};
use roadsync_test::{Session, SimWorld, HOST_FIRST_LANE};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Peers on the same version are accepted quietly
#[test]
fn matching_versions_raise_no_events() {
    init_logging();
    let mut session = Session::standard(2);

    let checks = session
        .hub
        .deliveries_to(PeerId::HOST)
        .into_iter()
        .filter(|delivery| {
            matches!(delivery.message, SyncMessage::VersionCheck(check) if check.protocol_version == PROTOCOL_VERSION)
        })
        .count();
    assert_eq!(checks, 2);

    for peer in [PeerId(1), PeerId(2)] {
        let results: Vec<_> = session
            .hub
            .deliveries_to(peer)
            .into_iter()
            .filter_map(|delivery| match delivery.message {
                SyncMessage::VersionResult(result) => Some(result),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].accepted);
        assert!(!session
            .peer_mut(peer)
            .engine
            .take_events()
            .iter()
            .any(|event| matches!(event, PeerEvent::VersionMismatch { .. })));
    }
    assert!(!session
        .host
        .take_events()
        .iter()
        .any(|event| matches!(event, HostEvent::VersionMismatch { .. })));
}

/// A peer on another version is told so, and the host records who it was
#[test]
fn mismatched_peer_is_reported_on_both_sides() {
    init_logging();
    let mut session = Session::host_only(SyncConfig::default(), SimWorld::standard(HOST_FIRST_LANE));
    session.join_peer(SimWorld::standard(1000));
    let newer = SyncConfig {
        protocol_version: PROTOCOL_VERSION + 1,
        ..SyncConfig::default()
    };
    let late = session.join_peer_with_config(newer, SimWorld::standard(2000));
    session.pump();

    let host_events = session.host.take_events();
    let mismatches: Vec<_> = host_events
        .iter()
        .filter(|event| matches!(event, HostEvent::VersionMismatch { .. }))
        .collect();
    assert_eq!(
        mismatches,
        vec![&HostEvent::VersionMismatch {
            peer: late,
            peer_version: PROTOCOL_VERSION + 1,
            host_version: PROTOCOL_VERSION,
        }]
    );

    let peer_events = session.peer_mut(late).engine.take_events();
    assert!(peer_events.contains(&PeerEvent::VersionMismatch {
        host_version: PROTOCOL_VERSION,
        local_version: PROTOCOL_VERSION + 1,
    }));

    // the verdict goes to the announcing peer alone
    assert!(!session
        .hub
        .deliveries_to(PeerId(1))
        .iter()
        .any(|delivery| matches!(delivery.message, SyncMessage::VersionResult(result) if !result.accepted)));
}

/// The host answers a direct check with the verdict it sent
#[test]
fn version_check_reply_matches_verdict() {
    init_logging();
    let mut session = Session::standard(1);
    session.hub.clear_log();

    let result = session
        .host
        .handle_version_check(PeerId(1), VersionCheck::new(PROTOCOL_VERSION.wrapping_sub(1)));

    assert!(!result.accepted);
    assert_eq!(result.host_version, PROTOCOL_VERSION);
    let delivered: Vec<_> = session
        .hub
        .deliveries_to(PeerId(1))
        .into_iter()
        .map(|delivery| delivery.message)
        .collect();
    assert_eq!(delivered, vec![SyncMessage::VersionResult(result)]);
}
