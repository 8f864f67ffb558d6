// End-to-end relay tests over real sockets.
//
// The relay runs on an OS-assigned port; peers are either raw framed TCP
// sockets (to drive the protocol step by step) or `NetClient`s. Command
// payloads are arbitrary bytes here: the relay never looks inside them.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use switchyard_protocol::framing::{recv, send};
use switchyard_protocol::message::{ClientMessage, ServerMessage, TurnCommand};
use switchyard_protocol::types::{ActionSequence, RelayPlayerId, TurnNumber};
use switchyard_protocol::PROTOCOL_VERSION;
use switchyard_relay::client::HelloInfo;
use switchyard_relay::{NetClient, NetError, RelayConfig, start_relay};

struct RawPeer {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RawPeer {
    fn connect(addr: SocketAddr, name: &str, password: Option<&str>) -> (Self, ServerMessage) {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut peer = RawPeer {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: BufWriter::new(stream),
        };
        peer.send(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: name.into(),
            sim_version_hash: 0xABCD,
            config_hash: 0x1234,
            session_password: password.map(String::from),
        });
        let reply = peer.recv();
        (peer, reply)
    }

    fn send(&mut self, msg: &ClientMessage) {
        send(&mut self.writer, msg).unwrap();
    }

    fn recv(&mut self) -> ServerMessage {
        recv(&mut self.reader).unwrap()
    }

    /// Read until `pick` accepts a message, skipping everything else.
    fn wait_for<T>(&mut self, mut pick: impl FnMut(ServerMessage) -> Option<T>) -> T {
        for _ in 0..50 {
            if let Some(found) = pick(self.recv()) {
                return found;
            }
        }
        panic!("expected message did not arrive");
    }
}

fn relay(password: Option<&str>) -> (switchyard_relay::RelayHandle, SocketAddr) {
    start_relay(RelayConfig {
        port: 0,
        session_name: "smoke".into(),
        password: password.map(String::from),
        turn_duration_ms: 20,
        ..RelayConfig::default()
    })
    .unwrap()
}

fn turn_commands(msg: ServerMessage) -> Option<(TurnNumber, Vec<TurnCommand>)> {
    match msg {
        ServerMessage::Turn {
            turn_number,
            commands,
        } => Some((turn_number, commands)),
        _ => None,
    }
}

#[test]
fn full_session_lifecycle() {
    let (handle, addr) = relay(None);

    let (mut ada, welcome) = RawPeer::connect(addr, "Ada", None);
    assert!(matches!(
        welcome,
        ServerMessage::Welcome { player_id: RelayPlayerId(0), host_id: RelayPlayerId(0), .. }
    ));
    let (mut bo, welcome) = RawPeer::connect(addr, "Bo", None);
    assert!(matches!(
        welcome,
        ServerMessage::Welcome { player_id: RelayPlayerId(1), host_id: RelayPlayerId(0), .. }
    ));
    assert!(matches!(
        ada.recv(),
        ServerMessage::PlayerJoined { player } if player.name == "Bo"
    ));

    // A non-host start is ignored; the host's goes through.
    bo.send(&ClientMessage::StartGame { seed: 9, config_json: "{}".into() });
    ada.send(&ClientMessage::StartGame { seed: 42, config_json: "{}".into() });
    for peer in [&mut ada, &mut bo] {
        assert_eq!(
            peer.recv(),
            ServerMessage::GameStart { seed: 42, config_json: "{}".into() }
        );
    }

    bo.send(&ClientMessage::Command { sequence: ActionSequence(0), payload: vec![2] });
    ada.send(&ClientMessage::Command { sequence: ActionSequence(0), payload: vec![1] });
    let (turn_a, cmds_a) = ada.wait_for(turn_commands);
    let (turn_b, cmds_b) = bo.wait_for(turn_commands);
    assert_eq!(turn_a, turn_b);
    assert_eq!(cmds_a, cmds_b);
    let all: Vec<TurnCommand> = if cmds_a.len() == 2 {
        cmds_a
    } else {
        // The two commands straddled a turn boundary.
        let (_, rest) = ada.wait_for(turn_commands);
        bo.wait_for(turn_commands);
        cmds_a.into_iter().chain(rest).collect()
    };
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|c| c.payload == vec![c.player_id.0 as u8 + 1]));

    ada.send(&ClientMessage::Checksum { turn: turn_a, hash: 0xAAAA });
    bo.send(&ClientMessage::Checksum { turn: turn_a, hash: 0xBBBB });
    assert_eq!(
        ada.wait_for(|m| matches!(m, ServerMessage::DesyncDetected { .. }).then_some(m)),
        ServerMessage::DesyncDetected { turn: turn_a }
    );

    ada.send(&ClientMessage::Goodbye);
    let left = bo.wait_for(|m| match m {
        ServerMessage::PlayerLeft { player_id, .. } => Some(player_id),
        _ => None,
    });
    assert_eq!(left, RelayPlayerId(0));

    handle.stop();
}

#[test]
fn wrong_password_rejected_with_reason() {
    let (handle, addr) = relay(Some("secret"));
    let (_ada, welcome) = RawPeer::connect(addr, "Ada", Some("secret"));
    assert!(matches!(welcome, ServerMessage::Welcome { .. }));

    let (_intruder, reply) = RawPeer::connect(addr, "Intruder", Some("guess"));
    assert_eq!(
        reply,
        ServerMessage::Rejected { reason: "incorrect password".into() }
    );
    handle.stop();
}

#[test]
fn net_client_handshake_and_rejection() {
    let (handle, addr) = relay(None);
    let addr = addr.to_string();
    let hello = |name: &str, config_hash| HelloInfo {
        player_name: name.into(),
        sim_version_hash: 7,
        config_hash,
        password: None,
    };

    let host = NetClient::connect(&addr, hello("host", 1)).unwrap();
    assert!(host.is_host());
    assert_eq!(host.welcome().session_name, "smoke");

    match NetClient::connect(&addr, hello("odd", 2)) {
        Err(NetError::Rejected(reason)) => assert_eq!(reason, "config hash mismatch"),
        Err(e) => panic!("expected a rejection, got {e}"),
        Ok(_) => panic!("expected a rejection"),
    }

    let guest = NetClient::connect(&addr, hello("guest", 1)).unwrap();
    assert!(!guest.is_host());
    assert_eq!(guest.welcome().players.len(), 2);
    handle.stop();
}

#[test]
fn net_client_notices_relay_shutdown() {
    let (handle, addr) = relay(None);
    let mut client = NetClient::connect(
        &addr.to_string(),
        HelloInfo {
            player_name: "solo".into(),
            sim_version_hash: 0,
            config_hash: 0,
            password: None,
        },
    )
    .unwrap();
    client.send_start_game(1, "{}".into()).unwrap();

    handle.stop();
    // Dropping the event loop closes every peer socket.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !client.is_disconnected() && Instant::now() < deadline {
        let _ = client.poll();
        thread::sleep(Duration::from_millis(10));
    }
    assert!(client.is_disconnected());
    assert!(matches!(client.send_command(vec![1]), Err(NetError::Disconnected)));
}
