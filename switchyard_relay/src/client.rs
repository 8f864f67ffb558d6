// Peer side of a relay connection.
//
// `NetClient::connect` does the TCP connect and the `Hello` handshake on the
// calling thread, then hands the read half to a background thread that
// decodes `ServerMessage`s into an `mpsc` channel. The game thread sends on
// the write half directly (messages are small, writes are synchronous) and
// drains the channel with `poll()`, which never blocks.
//
// When the reader thread stops (EOF, I/O error, malformed frame) it raises
// the shared `disconnected` flag. Callers check `is_disconnected()` after
// draining so that messages received before the loss are still applied.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use switchyard_protocol::framing::{recv, send};
use switchyard_protocol::message::{ClientMessage, PlayerInfo, ServerMessage};
use switchyard_protocol::types::{ActionSequence, RelayPlayerId, TurnNumber};
use switchyard_protocol::PROTOCOL_VERSION;
use thiserror::Error;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum NetError {
    #[error("relay i/o: {0}")]
    Io(#[from] io::Error),
    #[error("rejected by relay: {0}")]
    Rejected(String),
    #[error("unexpected handshake reply: {0}")]
    Handshake(String),
    #[error("connection to relay lost")]
    Disconnected,
}

/// What the relay told us in `Welcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeInfo {
    pub player_id: RelayPlayerId,
    pub host_id: RelayPlayerId,
    pub session_name: String,
    pub players: Vec<PlayerInfo>,
    pub turn_duration_ms: u32,
}

impl WelcomeInfo {
    pub fn is_host(&self) -> bool {
        self.player_id == self.host_id
    }
}

/// Identity presented in `Hello`.
#[derive(Debug, Clone)]
pub struct HelloInfo {
    pub player_name: String,
    pub sim_version_hash: u64,
    pub config_hash: u64,
    pub password: Option<String>,
}

pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    disconnected: Arc<AtomicBool>,
    welcome: WelcomeInfo,
    next_sequence: ActionSequence,
}

impl NetClient {
    pub fn connect(addr: &str, hello: HelloInfo) -> Result<Self, NetError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream.try_clone()?);

        send(
            &mut writer,
            &ClientMessage::Hello {
                protocol_version: PROTOCOL_VERSION,
                player_name: hello.player_name,
                sim_version_hash: hello.sim_version_hash,
                config_hash: hello.config_hash,
                session_password: hello.password,
            },
        )?;

        let welcome = match recv::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Welcome {
                player_id,
                host_id,
                session_name,
                players,
                turn_duration_ms,
            } => WelcomeInfo {
                player_id,
                host_id,
                session_name,
                players,
                turn_duration_ms,
            },
            ServerMessage::Rejected { reason } => return Err(NetError::Rejected(reason)),
            other => return Err(NetError::Handshake(format!("{other:?}"))),
        };
        stream.set_read_timeout(None)?;
        log::info!(
            target: "switchyard::net",
            "joined {:?} as {} (host {})",
            welcome.session_name,
            welcome.player_id,
            welcome.host_id
        );

        let (tx, inbox) = mpsc::channel();
        let disconnected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&disconnected);
        thread::spawn(move || reader_loop(reader, tx, flag));

        Ok(Self {
            writer,
            inbox,
            disconnected,
            welcome,
            next_sequence: ActionSequence(0),
        })
    }

    pub fn welcome(&self) -> &WelcomeInfo {
        &self.welcome
    }

    pub fn player_id(&self) -> RelayPlayerId {
        self.welcome.player_id
    }

    pub fn is_host(&self) -> bool {
        self.welcome.is_host()
    }

    /// Send one encoded command packet. Returns the sequence number it was
    /// sent under.
    pub fn send_command(&mut self, payload: Vec<u8>) -> Result<ActionSequence, NetError> {
        let sequence = self.next_sequence;
        self.send(&ClientMessage::Command { sequence, payload })?;
        self.next_sequence = ActionSequence(sequence.0 + 1);
        Ok(sequence)
    }

    pub fn send_checksum(&mut self, turn: TurnNumber, hash: u64) -> Result<(), NetError> {
        self.send(&ClientMessage::Checksum { turn, hash })
    }

    /// Host only; the relay ignores it from anyone else.
    pub fn send_start_game(&mut self, seed: u64, config_json: String) -> Result<(), NetError> {
        self.send(&ClientMessage::StartGame { seed, config_json })
    }

    /// Say goodbye. Best effort: the connection may already be gone.
    pub fn disconnect(&mut self) {
        if let Err(e) = send(&mut self.writer, &ClientMessage::Goodbye) {
            log::debug!(target: "switchyard::net", "goodbye not delivered: {e}");
        }
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// Everything received since the last call, in arrival order.
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    fn send(&mut self, msg: &ClientMessage) -> Result<(), NetError> {
        if self.is_disconnected() {
            return Err(NetError::Disconnected);
        }
        send(&mut self.writer, msg).map_err(|e| {
            self.disconnected.store(true, Ordering::SeqCst);
            NetError::Io(e)
        })
    }
}

fn reader_loop(
    mut reader: BufReader<TcpStream>,
    tx: Sender<ServerMessage>,
    disconnected: Arc<AtomicBool>,
) {
    loop {
        match recv::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::debug!(target: "switchyard::net", "relay reader stopped: {e}");
                break;
            }
        }
    }
    disconnected.store(true, Ordering::SeqCst);
}
