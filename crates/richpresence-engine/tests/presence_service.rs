#![cfg(unix)]

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use richpresence_engine::{
    Config, Dimension, HostState, PresenceService, PresenceSnapshot, SharedConfig,
};
use richpresence_frame::Opcode;
use richpresence_transport::LocalDiscovery;
use serde_json::json;

use support::{
    configured, service_for, test_options, unique_temp_dir, wait_until, FakeDiscord, APP_ID,
    START_EPOCH,
};

const QUIET: Duration = Duration::from_millis(150);

#[test]
fn start_handshakes_with_configured_id() {
    let fake = FakeDiscord::start("handshake");
    let (mut service, _clock) = service_for(&fake, configured());

    service.start();
    assert!(service.is_started());
    assert!(service.is_connected());
    assert_eq!(service.pipe_index(), Some(0));
    assert_eq!(fake.expect_handshake(), json!({ "v": 1, "client_id": APP_ID }));

    service.start();
    assert_eq!(fake.connections(), 1);
}

#[test]
fn first_tick_sends_and_unchanged_snapshot_is_debounced() {
    let fake = FakeDiscord::start("debounce");
    let (mut service, clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();

    service.on_tick(&HostState::Menu);
    let activity = fake.expect_activity();
    assert_eq!(activity["state"], "In the menus");
    assert_eq!(activity["details"], "In Minecraft");
    assert_eq!(activity["timestamps"]["start"], START_EPOCH);
    assert_eq!(activity["assets"]["large_image"], "minecraft");

    clock.advance(Duration::from_secs(5));
    service.on_tick(&HostState::Menu);
    fake.assert_quiet(QUIET);

    clock.advance(Duration::from_secs(5));
    service.on_tick(&HostState::Singleplayer {
        dimension: Dimension::End,
    });
    let activity = fake.expect_activity();
    assert_eq!(activity["state"], "Playing singleplayer | End");
    assert_eq!(activity["timestamps"]["start"], START_EPOCH);
}

#[test]
fn interval_gate_samples_once_per_interval() {
    let fake = FakeDiscord::start("interval");
    let config = Config {
        update_interval_seconds: 5,
        ..configured()
    };
    let (mut service, clock) = service_for(&fake, config);
    service.start();
    fake.expect_handshake();

    let sampled = AtomicUsize::new(0);
    let sampler = |_: &Config| {
        let n = sampled.fetch_add(1, Ordering::SeqCst);
        PresenceSnapshot {
            state: Some(format!("tick {n}")),
            ..PresenceSnapshot::default()
        }
    };

    service.on_tick(&sampler);
    service.on_tick(&sampler);
    assert_eq!(sampled.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(4));
    service.on_tick(&sampler);
    assert_eq!(sampled.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(1));
    service.on_tick(&sampler);
    assert_eq!(sampled.load(Ordering::SeqCst), 2);

    assert_eq!(fake.expect_activity()["state"], "tick 0");
    assert_eq!(fake.expect_activity()["state"], "tick 1");
}

#[test]
fn huge_interval_keeps_gate_closed_without_panicking() {
    let fake = FakeDiscord::start("huge-interval");
    let config = Config {
        update_interval_seconds: i64::MAX,
        ..configured()
    };
    let (mut service, clock) = service_for(&fake, config);
    service.start();
    fake.expect_handshake();

    service.on_tick(&HostState::Menu);
    assert_eq!(fake.expect_activity()["state"], "In the menus");

    clock.advance(Duration::from_secs(10 * 365 * 86_400));
    service.on_tick(&HostState::Singleplayer {
        dimension: Dimension::Nether,
    });
    fake.assert_quiet(QUIET);
    assert!(service.is_started());
}

#[test]
fn ping_is_echoed_exactly_once() {
    let fake = FakeDiscord::start("ping");
    let (mut service, _clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();

    fake.send(Opcode::Ping, b"abc");
    let pong = fake.expect_pong();
    assert_eq!(pong.payload.as_ref(), b"abc");
    fake.assert_quiet(QUIET);
    assert!(service.is_connected());
}

#[test]
fn peer_close_stops_service_without_panicking() {
    let fake = FakeDiscord::start("close");
    let (mut service, clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();

    fake.send(Opcode::Close, br#"{"code":1000,"message":"bye"}"#);
    wait_until(Duration::from_secs(3), || !service.is_connected());

    let sampled = AtomicUsize::new(0);
    let sampler = |_: &Config| {
        sampled.fetch_add(1, Ordering::SeqCst);
        PresenceSnapshot::default()
    };
    service.on_tick(&sampler);
    assert!(!service.is_started());

    clock.advance(Duration::from_secs(10));
    service.on_tick(&sampler);
    assert_eq!(sampled.load(Ordering::SeqCst), 0);
    fake.assert_quiet(QUIET);
}

#[test]
fn error_event_stops_service() {
    let fake = FakeDiscord::start("error-evt");
    let (mut service, _clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();

    fake.send(
        Opcode::Message,
        br#"{"cmd":"SET_ACTIVITY","evt":"ERROR","data":{"code":4000,"message":"child \"activity\" fails"}}"#,
    );
    wait_until(Duration::from_secs(3), || !service.is_connected());

    service.on_tick(&HostState::Menu);
    assert!(!service.is_started());
}

#[test]
fn hang_up_is_treated_as_connection_loss() {
    let fake = FakeDiscord::start("hangup");
    let (mut service, _clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();

    fake.hang_up();
    wait_until(Duration::from_secs(3), || !service.is_connected());
    service.on_tick(&HostState::Menu);
    assert!(!service.is_started());
}

#[test]
fn stop_clears_presence() {
    let fake = FakeDiscord::start("stop");
    let (mut service, _clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();
    service.on_tick(&HostState::Menu);
    fake.expect_activity();

    service.stop();
    assert!(!service.is_started());
    assert_eq!(fake.expect_activity(), json!({}));

    service.stop();
    service.on_tick(&HostState::Menu);
    fake.assert_quiet(QUIET);
}

#[test]
fn disabling_mid_session_stops_on_next_tick() {
    let fake = FakeDiscord::start("disable");
    let shared = SharedConfig::new(configured());
    let (mut service, _clock) = service_for(&fake, shared.clone());
    service.start();
    fake.expect_handshake();

    shared.update(|config| config.enabled = false);
    service.on_tick(&HostState::Menu);

    assert!(!service.is_started());
    assert_eq!(fake.expect_activity(), json!({}));
}

#[test]
fn restart_picks_up_new_application_id() {
    let fake = FakeDiscord::start("restart");
    let shared = SharedConfig::new(configured());
    let (mut service, clock) = service_for(&fake, shared.clone());
    service.start();
    fake.expect_handshake();
    service.on_tick(&HostState::Menu);
    fake.expect_activity();

    shared.update(|config| config.application_id = "999000111222333444".into());
    service.restart();

    assert_eq!(fake.expect_activity(), json!({}));
    assert_eq!(fake.expect_handshake()["client_id"], "999000111222333444");
    assert!(service.is_started());
    assert_eq!(fake.connections(), 2);

    // Fresh session: the same snapshot is sent again.
    clock.advance(Duration::from_secs(1));
    service.on_tick(&HostState::Menu);
    assert_eq!(fake.expect_activity()["state"], "In the menus");
}

#[test]
fn placeholder_id_refuses_to_start() {
    let fake = FakeDiscord::start("placeholder");
    let (mut service, _clock) = service_for(&fake, Config::default());
    service.start();
    assert!(!service.is_started());
    assert!(fake.next_frame(QUIET).is_none());
    assert_eq!(fake.connections(), 0);
}

#[test]
fn no_listening_peer_leaves_service_stopped() {
    let dir = unique_temp_dir("absent");
    let mut service = PresenceService::with_parts(
        configured(),
        LocalDiscovery::with_dir(&dir),
        richpresence_engine::SystemClock,
        test_options(),
    );

    service.start();
    assert!(!service.is_started());
    assert_eq!(service.pipe_index(), None);
    service.on_tick(&HostState::Menu);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn later_candidate_index_is_reported() {
    let fake = FakeDiscord::start_at("index", 4);
    let (mut service, _clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();
    assert_eq!(service.pipe_index(), Some(4));
}

#[test]
fn drop_stops_and_clears() {
    let fake = FakeDiscord::start("drop");
    let (mut service, _clock) = service_for(&fake, configured());
    service.start();
    fake.expect_handshake();

    drop(service);
    assert_eq!(fake.expect_activity(), json!({}));
}
