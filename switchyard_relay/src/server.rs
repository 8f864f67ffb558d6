// TCP front end and event loop for the relay.
//
// Threads:
// - **Acceptor**: non-blocking `accept()` loop that forwards each new
//   socket to the event loop and otherwise sleeps briefly, checking the
//   shutdown flag.
// - **Readers** (one per admitted player): blocking `recv()` loop that turns
//   frames into `Event::Message`, and EOF, I/O errors, malformed frames or
//   `Goodbye` into `Event::Gone`.
// - **Event loop**: owns the `Session`. Waits on the channel with the turn
//   cadence as timeout and flushes a turn whenever the cadence elapses.
//
// The event loop is the only thread that writes to sockets. The handshake
// (`Hello` -> `Welcome`/`Rejected`) also runs on the event loop, bounded by
// a short read timeout, so admission decisions are serialized with
// everything else the session does.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use switchyard_protocol::framing::recv;
use switchyard_protocol::message::ClientMessage;
use switchyard_protocol::types::RelayPlayerId;

use crate::session::{JoinRequest, Session};

const LOG_TARGET: &str = "switchyard::relay";
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const ACCEPT_POLL: Duration = Duration::from_millis(20);

type PeerWriter = BufWriter<TcpStream>;

enum Event {
    Connected(TcpStream),
    Message(RelayPlayerId, ClientMessage),
    Gone(RelayPlayerId),
}

/// Settings for one relay instance.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: String,
    pub port: u16,
    pub session_name: String,
    pub password: Option<String>,
    /// Interval between turn flushes.
    pub turn_duration_ms: u32,
    pub max_players: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 7878,
            session_name: "switchyard".into(),
            password: None,
            turn_duration_ms: 50,
            max_players: 8,
        }
    }
}

/// Controls a running relay.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Ask the relay to stop and wait for the event loop to exit.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join_inner();
    }

    /// Block until the relay exits on its own.
    pub fn join(mut self) {
        self.join_inner();
    }

    fn join_inner(&mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!(target: LOG_TARGET, "relay event loop panicked");
        }
    }
}

/// Bind and start the relay on background threads. Returns the bound
/// address, which differs from the configured one when `port` is 0.
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.bind_addr.as_str(), config.port))?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    log::info!(target: LOG_TARGET, "session {:?} listening on {addr}", config.session_name);

    let keep_running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = mpsc::channel();

    let acceptor_flag = Arc::clone(&keep_running);
    let acceptor_tx = tx.clone();
    thread::spawn(move || accept_loop(listener, acceptor_tx, acceptor_flag));

    let loop_flag = Arc::clone(&keep_running);
    let thread = thread::spawn(move || event_loop(config, rx, tx, loop_flag));

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

fn accept_loop(listener: TcpListener, tx: Sender<Event>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                log::debug!(target: LOG_TARGET, "connection from {peer}");
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                if tx.send(Event::Connected(stream)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                log::error!(target: LOG_TARGET, "accept failed: {e}");
                break;
            }
        }
    }
}

fn event_loop(
    config: RelayConfig,
    rx: Receiver<Event>,
    tx: Sender<Event>,
    keep_running: Arc<AtomicBool>,
) {
    let mut session: Session<PeerWriter> = Session::new(
        config.session_name,
        config.password,
        config.turn_duration_ms,
        config.max_players,
    );
    let cadence = Duration::from_millis(u64::from(config.turn_duration_ms.max(1)));
    let mut next_flush = Instant::now() + cadence;

    while keep_running.load(Ordering::SeqCst) {
        let wait = next_flush.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(event) => handle_event(&mut session, event, &tx, &keep_running),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if Instant::now() >= next_flush {
            session.flush_turn();
            next_flush = Instant::now() + cadence;
        }
    }
    // Reader threads hold their own handles, so dropping the writers alone
    // would leave the sockets open.
    for writer in session.into_writers() {
        let _ = writer.get_ref().shutdown(Shutdown::Both);
    }
    log::info!(target: LOG_TARGET, "relay stopped");
}

fn handle_event(
    session: &mut Session<PeerWriter>,
    event: Event,
    tx: &Sender<Event>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        Event::Connected(stream) => admit(session, stream, tx, keep_running),
        Event::Gone(player_id) => session.remove_player(player_id),
        Event::Message(player_id, message) => match message {
            ClientMessage::Command { sequence, payload } => {
                session.enqueue_command(player_id, sequence, payload);
            }
            ClientMessage::Checksum { turn, hash } => {
                session.record_checksum(player_id, turn, hash);
            }
            ClientMessage::StartGame { seed, config_json } => {
                session.start_game(player_id, seed, config_json);
            }
            ClientMessage::Hello { .. } => {
                log::warn!(target: LOG_TARGET, "{player_id} repeated Hello");
            }
            // Readers turn Goodbye into Gone.
            ClientMessage::Goodbye => session.remove_player(player_id),
        },
    }
}

/// Run the handshake for a fresh connection and, if admitted, start its
/// reader thread.
fn admit(
    session: &mut Session<PeerWriter>,
    stream: TcpStream,
    tx: &Sender<Event>,
    keep_running: &Arc<AtomicBool>,
) {
    let (Ok(read_half), Ok(write_half)) = (stream.try_clone(), stream.try_clone()) else {
        return;
    };
    if stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).is_err() {
        return;
    }
    let mut reader = BufReader::new(read_half);
    let writer = BufWriter::new(write_half);

    let request = match recv::<_, ClientMessage>(&mut reader) {
        Ok(ClientMessage::Hello {
            protocol_version,
            player_name,
            sim_version_hash,
            config_hash,
            session_password,
        }) => JoinRequest {
            protocol_version,
            player_name,
            sim_version_hash,
            config_hash,
            session_password,
        },
        Ok(other) => {
            log::warn!(target: LOG_TARGET, "expected Hello, got {other:?}");
            return;
        }
        Err(e) => {
            log::warn!(target: LOG_TARGET, "handshake failed: {e}");
            return;
        }
    };

    match session.add_player(request, writer) {
        Ok(player_id) => {
            if stream.set_read_timeout(None).is_err() {
                session.remove_player(player_id);
                return;
            }
            let tx = tx.clone();
            let keep_running = Arc::clone(keep_running);
            thread::spawn(move || reader_loop(reader, player_id, tx, keep_running));
        }
        Err(rejection) => {
            // `add_player` consumed the writer; reject on a fresh handle.
            if let Ok(raw) = stream.try_clone() {
                Session::reject(&mut BufWriter::new(raw), &rejection);
            }
        }
    }
}

fn reader_loop(
    mut reader: BufReader<TcpStream>,
    player_id: RelayPlayerId,
    tx: Sender<Event>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match recv::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => break,
            Ok(message) => {
                if tx.send(Event::Message(player_id, message)).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::debug!(target: LOG_TARGET, "{player_id} reader stopped: {e}");
                break;
            }
        }
    }
    let _ = tx.send(Event::Gone(player_id));
}
