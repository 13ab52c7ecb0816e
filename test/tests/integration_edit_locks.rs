/// Integration tests for edit locks
///
/// The host grants first come, first served and broadcasts every lock state
/// change; peers mirror it to gate their own tools. Locks never block applies.

use roadsync_client::PeerEvent;
use roadsync_server::HostEvent;
use roadsync_shared::{EntityRef, FeatureKind, FeatureTarget, FeatureValue, PeerId, SyncConfig, SyncMessage};
use roadsync_test::Session;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session_with_ttl(ttl: u32, peers: u32) -> Session {
    let config = SyncConfig {
        lock_ttl_ticks: ttl,
        ..SyncConfig::default()
    };
    Session::with_config(config, peers)
}

/// The first peer to ask owns the lock; everyone else sees it as foreign
#[test]
fn first_requester_owns_lock_everywhere() {
    init_logging();
    let mut session = Session::standard(2);
    let segment = EntityRef::segment(10);

    session.peer(PeerId(1)).engine.begin_edit(segment);
    session.pump();
    session.peer(PeerId(2)).engine.begin_edit(segment);
    session.pump();

    assert_eq!(session.host.world().locks().owner(&segment).unwrap(), Some(PeerId(1)));
    assert!(!session.peer(PeerId(1)).engine.is_locked_by_other(&segment));
    assert!(session.peer(PeerId(2)).engine.is_locked_by_other(&segment));
    assert!(session.peer(PeerId(2)).engine.is_locked(&segment));

    let events = session.peer_mut(PeerId(2)).engine.take_events();
    assert!(events.iter().any(|event| matches!(
        event,
        PeerEvent::LockApplied { target, owner } if *target == segment && *owner == PeerId(1)
    )));
}

/// Ending an edit clears the lock on every mirror
#[test]
fn end_edit_clears_mirrors() {
    init_logging();
    let mut session = Session::standard(2);
    let node = EntityRef::node(2);

    session.peer(PeerId(1)).engine.begin_edit(node);
    session.pump();
    session.peer(PeerId(1)).engine.end_edit(node);
    session.pump();

    assert!(!session.host.world().locks().is_locked(&node));
    for peer in &session.peers {
        assert!(!peer.engine.is_locked(&node));
    }
}

/// Ending an edit nobody holds is still broadcast
#[test]
fn end_edit_without_lock_still_broadcasts() {
    init_logging();
    let mut session = Session::standard(1);
    session.hub.clear_log();

    session.peer(PeerId(1)).engine.end_edit(EntityRef::lane(41));
    session.pump();

    assert!(session
        .hub
        .deliveries_to(PeerId(1))
        .iter()
        .any(|delivery| matches!(delivery.message, SyncMessage::EditLockCleared(_))));
}

/// A lock granted with TTL n is gone after n host ticks
#[test]
fn lock_expires_after_ttl() {
    init_logging();
    let mut session = session_with_ttl(5, 1);
    let node = EntityRef::node(3);
    session.host.take_events();

    session.peer(PeerId(1)).engine.begin_edit(node);
    for _ in 0..4 {
        session.tick();
        assert!(session.host.world().locks().is_locked(&node));
    }
    session.tick();

    assert!(!session.host.world().locks().is_locked(&node));
    assert!(!session.peer(PeerId(1)).engine.is_locked(&node));
    let events = session.host.take_events();
    assert!(events.contains(&HostEvent::LockGranted {
        target: node,
        owner: PeerId(1)
    }));
    assert!(events.contains(&HostEvent::LockCleared { target: node }));
}

/// Another BeginEdit before expiry refreshes the TTL without changing the owner
#[test]
fn begin_edit_refreshes_ttl() {
    init_logging();
    let mut session = session_with_ttl(3, 2);
    let segment = EntityRef::segment(11);

    session.peer(PeerId(1)).engine.begin_edit(segment);
    session.tick();
    session.tick();
    session.peer(PeerId(2)).engine.begin_edit(segment);
    session.tick();
    session.tick();

    assert_eq!(session.host.world().locks().owner(&segment).unwrap(), Some(PeerId(1)));
}

/// A lock held by one peer does not stop another peer's request
#[test]
fn locks_are_advisory() {
    init_logging();
    let mut session = Session::standard(2);
    let segment = EntityRef::segment(10);
    session.peer(PeerId(1)).engine.begin_edit(segment);
    session.pump();

    session
        .peer(PeerId(2))
        .engine
        .request_change(
            FeatureTarget::Segment { segment: 10 },
            FeatureValue::ParkingRestriction {
                forward: false,
                backward: true,
            },
        )
        .unwrap();
    session.pump();

    assert_eq!(
        session
            .host_sim()
            .value(FeatureKind::ParkingRestriction, &FeatureTarget::Segment { segment: 10 }),
        Some(FeatureValue::ParkingRestriction {
            forward: false,
            backward: true
        })
    );
}

/// Restarting the host drops every lock
#[test]
fn host_restart_drops_locks() {
    init_logging();
    let mut session = Session::standard(1);
    let node = EntityRef::node(1);
    session.peer(PeerId(1)).engine.begin_edit(node);
    session.pump();

    session.host.stop();
    session.host.start(session.now);

    assert!(session.host.world().locks().locks().unwrap().is_empty());
}
