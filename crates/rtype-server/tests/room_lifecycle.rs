//! Exercises a room's join/ready/countdown/playing lifecycle and its
//! kick/ban/promote authority rules entirely through the public
//! [`rtype_server::GameInstance`] API plus the wire control codec, the
//! same way a client and server would actually talk to each other.

use std::net::SocketAddr;
use std::sync::Arc;

use rtype_level::loader::load_level_str;
use rtype_level::data::REQUIRED_ARCHETYPE_IDS;
use rtype_net::control;
use rtype_server::instance::{GameInstance, GameInstanceSettings};
use rtype_server::net_threads::RawControlPacket;
use rtype_server::room::RoomConfig;
use rtype_server::GameState;

fn archetypes_json() -> String {
    REQUIRED_ARCHETYPE_IDS
        .iter()
        .map(|id| format!(r#"{{"typeId": {id}, "spriteId": "s", "animId": "a", "layer": 0}}"#))
        .collect::<Vec<_>>()
        .join(",")
}

fn minimal_level() -> Arc<rtype_level::LevelData> {
    let json = format!(
        r#"{{
            "schemaVersion": 1,
            "levelId": 7,
            "meta": {{"backgroundId": "bg", "musicId": "music"}},
            "archetypes": [{}],
            "segments": [{{"id": "s0", "exit": {{"type": "distance", "distance": 1000000}}}}]
        }}"#,
        archetypes_json()
    );
    Arc::new(load_level_str(&json, "test").unwrap())
}

fn settings() -> GameInstanceSettings {
    GameInstanceSettings {
        full_state_interval: 60,
        max_packet_bytes: 1400,
        rollback_capacity: 120,
        checksum_interval: 60,
        timeout_threshold: 180,
    }
}

fn instance() -> (GameInstance, crossbeam_channel::Receiver<rtype_server::OutboundPacket>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let instance = GameInstance::new(1, RoomConfig::default(), minimal_level(), 42, tx, settings());
    (instance, rx)
}

fn addr(port: u16) -> SocketAddr {
    format!("127.0.0.1:{port}").parse().unwrap()
}

fn join(instance: &mut GameInstance, from: SocketAddr, name: &str) {
    let bytes = control::encode_client_join(0, name);
    instance.handle_control(RawControlPacket { bytes, from });
}

fn ready(instance: &mut GameInstance, from: SocketAddr) {
    let bytes = control::encode_client_ready(0);
    instance.handle_control(RawControlPacket { bytes, from });
}

#[test]
fn two_players_join_ready_and_reach_playing() {
    let (mut instance, _rx) = instance();
    let a = addr(20001);
    let b = addr(20002);

    join(&mut instance, a, "alice");
    join(&mut instance, b, "bob");
    assert_eq!(instance.session_count(), 2);
    assert_eq!(instance.state(), GameState::Lobby);

    ready(&mut instance, a);
    ready(&mut instance, b);
    instance.tick(&[], 1.0 / 60.0);
    assert!(matches!(instance.state(), GameState::Countdown { .. }));

    for _ in 0..(3 * 60 + 5) {
        instance.tick(&[], 1.0 / 60.0);
    }
    assert_eq!(instance.state(), GameState::Playing);
}

#[test]
fn lobby_does_not_advance_until_everyone_is_ready() {
    let (mut instance, _rx) = instance();
    let a = addr(20003);
    let b = addr(20004);
    join(&mut instance, a, "alice");
    join(&mut instance, b, "bob");

    ready(&mut instance, a);
    instance.tick(&[], 1.0 / 60.0);
    assert_eq!(instance.state(), GameState::Lobby);
}

#[test]
fn force_start_skips_ready_quorum_for_owner_only() {
    let (mut instance, _rx) = instance();
    let a = addr(20005);
    let b = addr(20006);
    join(&mut instance, a, "owner");
    join(&mut instance, b, "member");

    assert!(!instance.force_start(2));
    assert_eq!(instance.state(), GameState::Lobby);

    assert!(instance.force_start(1));
    assert!(matches!(instance.state(), GameState::Countdown { .. }));
}

#[test]
fn member_cannot_kick_but_owner_can() {
    let (mut instance, _rx) = instance();
    let a = addr(20007);
    let b = addr(20008);
    join(&mut instance, a, "owner");
    join(&mut instance, b, "member");

    assert!(!instance.kick(2, 1));
    assert_eq!(instance.session_count(), 2);

    assert!(instance.kick(1, 2));
    assert_eq!(instance.session_count(), 1);
}

#[test]
fn promote_lets_a_former_member_kick() {
    let (mut instance, _rx) = instance();
    let a = addr(20009);
    let b = addr(20010);
    let c = addr(20011);
    join(&mut instance, a, "owner");
    join(&mut instance, b, "future-admin");
    join(&mut instance, c, "member");

    assert!(!instance.kick(2, 3), "member has no kick rights before promotion");
    assert!(instance.promote(1, 2));
    assert!(instance.kick(2, 3));
    assert_eq!(instance.session_count(), 2);
}

#[test]
fn banned_endpoint_is_denied_on_rejoin() {
    let (mut instance, rx) = instance();
    let a = addr(20012);
    let b = addr(20013);
    join(&mut instance, a, "owner");
    join(&mut instance, b, "troublemaker");

    assert!(instance.ban(1, 2));
    assert_eq!(instance.session_count(), 1);

    join(&mut instance, b, "troublemaker-again");
    assert_eq!(instance.session_count(), 1, "banned endpoint must not re-join");

    let denied = rx
        .try_iter()
        .filter(|p| p.to == b)
        .any(|p| rtype_net::decode_frame(&p.bytes).map(|(h, _)| h.message_type == rtype_net::MessageType::ServerJoinDeny).unwrap_or(false));
    assert!(denied, "rejoin attempt should receive a join-deny packet");
}
