// Test harness for end-to-end multiplayer scenarios.
//
// `TestGameClient` is a real `GameSession` connected to a real relay, plus
// blocking helpers that poll until a condition holds or a timeout expires.
// Everything else (dispatch, replication, turn replay, callbacks) runs the
// same code as a real peer.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use switchyard_client::{GameSession, UiEvent, UiFeed};
use switchyard_relay::{RelayConfig, RelayHandle, start_relay};
use switchyard_sim::callback::CallbackId;
use switchyard_sim::command::CommandEnvelope;
use switchyard_sim::config::GameConfig;
use switchyard_sim::flags::DoCommandFlags;
use switchyard_sim::world::World;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Small dry map so tile 42 is an interior, buildable tile.
pub fn test_config() -> GameConfig {
    GameConfig {
        map_size_x: 16,
        map_size_y: 16,
        water_per_mille: 0,
        ..GameConfig::default()
    }
}

/// A relay with a fast turn cadence on a free port.
pub fn start_test_relay() -> (RelayHandle, SocketAddr) {
    start_relay(RelayConfig {
        port: 0,
        session_name: "pipeline".into(),
        turn_duration_ms: 10,
        ..RelayConfig::default()
    })
    .expect("relay failed to start")
}

pub struct TestGameClient {
    pub session: GameSession,
    ui: Receiver<UiEvent>,
    events: Vec<UiEvent>,
}

impl TestGameClient {
    pub fn connect(addr: SocketAddr, name: &str) -> Self {
        let (feed, ui) = UiFeed::channel();
        let session = GameSession::connect(&addr.to_string(), name, None, test_config(), feed)
            .expect("connect failed");
        Self {
            session,
            ui,
            events: Vec::new(),
        }
    }

    pub fn request(
        &mut self,
        envelope: CommandEnvelope,
        flags: DoCommandFlags,
        callback: Option<CallbackId>,
    ) -> bool {
        let accepted = self
            .session
            .request(envelope, flags, callback)
            .expect("request before game start");
        self.collect_events();
        accepted
    }

    pub fn flush(&mut self) -> usize {
        self.session.flush().expect("flush failed")
    }

    pub fn world(&self) -> &World {
        self.session.world().expect("game not started")
    }

    /// Poll the session until `done` holds.
    pub fn poll_until(&mut self, what: &str, mut done: impl FnMut(&GameSession) -> bool) {
        let start = Instant::now();
        loop {
            self.session.poll();
            self.collect_events();
            if done(&self.session) {
                return;
            }
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn wait_for_start(&mut self) {
        self.poll_until("GameStart", |s| s.world().is_some());
    }

    /// Keep polling for `period` without expecting anything in particular.
    pub fn idle(&mut self, period: Duration) {
        let start = Instant::now();
        while start.elapsed() < period {
            self.session.poll();
            self.collect_events();
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// UI events seen so far. Draining is left to `take_events`.
    pub fn events(&self) -> &[UiEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<UiEvent> {
        self.collect_events();
        std::mem::take(&mut self.events)
    }

    fn collect_events(&mut self) {
        self.events.extend(self.ui.try_iter());
    }
}

/// Relay plus two connected peers with the game started. The first peer is
/// the host and plays company 0; the second plays company 1.
pub fn two_player_game(seed: u64) -> (RelayHandle, TestGameClient, TestGameClient) {
    let (relay, addr) = start_test_relay();
    let mut host = TestGameClient::connect(addr, "host");
    let mut guest = TestGameClient::connect(addr, "guest");
    host.session.start_game(seed).expect("start_game failed");
    host.wait_for_start();
    guest.wait_for_start();
    (relay, host, guest)
}
