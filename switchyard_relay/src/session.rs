// Relay session state.
//
// `Session` is the ordering authority for one game. It owns the roster, the
// commands queued since the last turn, the turn counter and the per-turn
// checksum reports. `server.rs` drives it from a single thread; nothing in
// here locks.
//
// Responsibilities:
// - Admission: protocol version, password, capacity, and the sim-version /
//   config hashes (the first player sets the reference values). Players can
//   only join in the lobby; a late joiner would have no way to catch up.
// - Ordering: commands queue until `flush_turn`, then go out as one `Turn`
//   sorted by `(player_id, sequence)`. Turns are numbered from 1 and every
//   peer receives every turn, so all peers see one global order.
// - Desync detection: once every connected player has reported a checksum
//   for a turn, disagreement is broadcast as `DesyncDetected`.
//
// `Session` is generic over the per-player writer so tests can capture
// output in memory. Write failures are logged and otherwise ignored; the
// reader thread for that player notices the dead socket and reports the
// disconnect.

use std::collections::BTreeMap;
use std::io::Write;

use switchyard_protocol::framing::send;
use switchyard_protocol::message::{PlayerInfo, ServerMessage, TurnCommand};
use switchyard_protocol::types::{ActionSequence, RelayPlayerId, TurnNumber};
use switchyard_protocol::PROTOCOL_VERSION;
use thiserror::Error;

const LOG_TARGET: &str = "switchyard::relay";

/// Why a `Hello` was turned away. The `Display` text is sent to the peer in
/// `Rejected { reason }`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRejection {
    #[error("protocol version {got} not supported (relay speaks {expected})")]
    ProtocolVersion { got: u32, expected: u32 },
    #[error("incorrect password")]
    WrongPassword,
    #[error("session is full")]
    Full,
    #[error("game already started")]
    GameStarted,
    #[error("sim version mismatch")]
    SimVersionMismatch,
    #[error("config hash mismatch")]
    ConfigMismatch,
}

/// The `Hello` fields the session needs for admission.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub protocol_version: u32,
    pub player_name: String,
    pub sim_version_hash: u64,
    pub config_hash: u64,
    pub session_password: Option<String>,
}

struct Peer<W> {
    name: String,
    writer: W,
}

pub struct Session<W: Write> {
    pub name: String,
    password: Option<String>,
    max_players: usize,
    turn_duration_ms: u32,
    host_id: Option<RelayPlayerId>,
    players: BTreeMap<RelayPlayerId, Peer<W>>,
    next_player_id: u32,
    reference_hashes: Option<(u64, u64)>,
    started: bool,

    last_turn: TurnNumber,
    queued: Vec<TurnCommand>,
    checksums: BTreeMap<TurnNumber, BTreeMap<RelayPlayerId, u64>>,
}

impl<W: Write> Session<W> {
    pub fn new(
        name: String,
        password: Option<String>,
        turn_duration_ms: u32,
        max_players: usize,
    ) -> Self {
        Self {
            name,
            password,
            max_players,
            turn_duration_ms,
            host_id: None,
            players: BTreeMap::new(),
            next_player_id: 0,
            reference_hashes: None,
            started: false,
            last_turn: TurnNumber(0),
            queued: Vec::new(),
            checksums: BTreeMap::new(),
        }
    }

    /// Admit a player, send them `Welcome` and tell everyone else
    /// `PlayerJoined`.
    pub fn add_player(
        &mut self,
        request: JoinRequest,
        writer: W,
    ) -> Result<RelayPlayerId, JoinRejection> {
        if request.protocol_version != PROTOCOL_VERSION {
            return Err(JoinRejection::ProtocolVersion {
                got: request.protocol_version,
                expected: PROTOCOL_VERSION,
            });
        }
        if self.password.is_some() && request.session_password != self.password {
            return Err(JoinRejection::WrongPassword);
        }
        if self.players.len() >= self.max_players {
            return Err(JoinRejection::Full);
        }
        if self.started {
            return Err(JoinRejection::GameStarted);
        }
        match self.reference_hashes {
            None => self.reference_hashes = Some((request.sim_version_hash, request.config_hash)),
            Some((sim, _)) if sim != request.sim_version_hash => {
                return Err(JoinRejection::SimVersionMismatch);
            }
            Some((_, config)) if config != request.config_hash => {
                return Err(JoinRejection::ConfigMismatch);
            }
            Some(_) => {}
        }

        let id = RelayPlayerId(self.next_player_id);
        self.next_player_id += 1;
        let host_id = *self.host_id.get_or_insert(id);

        let info = PlayerInfo {
            id,
            name: request.player_name.clone(),
        };
        self.broadcast(&ServerMessage::PlayerJoined { player: info });
        self.players.insert(
            id,
            Peer {
                name: request.player_name,
                writer,
            },
        );
        let welcome = ServerMessage::Welcome {
            player_id: id,
            host_id,
            session_name: self.name.clone(),
            players: self.player_list(),
            turn_duration_ms: self.turn_duration_ms,
        };
        self.send_to(id, &welcome);
        log::info!(target: LOG_TARGET, "{id} joined ({} connected)", self.players.len());
        Ok(id)
    }

    /// Drop a player and broadcast `PlayerLeft`. Commands they already sent
    /// stay queued; they were accepted before the player left.
    pub fn remove_player(&mut self, player_id: RelayPlayerId) {
        let Some(peer) = self.players.remove(&player_id) else {
            return;
        };
        log::info!(target: LOG_TARGET, "{player_id} ({}) left", peer.name);
        self.broadcast(&ServerMessage::PlayerLeft {
            player_id,
            name: peer.name,
        });
        for reports in self.checksums.values_mut() {
            reports.remove(&player_id);
        }
        // Turns that were waiting only on the departed player can now be
        // compared.
        let complete: Vec<TurnNumber> = self
            .checksums
            .iter()
            .filter(|(_, reports)| !reports.is_empty() && reports.len() >= self.players.len())
            .map(|(turn, _)| *turn)
            .collect();
        for turn in complete {
            self.compare_checksums(turn);
        }
    }

    /// Queue a command for the next turn. Ignored before the game starts.
    pub fn enqueue_command(
        &mut self,
        player_id: RelayPlayerId,
        sequence: ActionSequence,
        payload: Vec<u8>,
    ) {
        if !self.started {
            log::warn!(target: LOG_TARGET, "{player_id} sent a command before the game started");
            return;
        }
        self.queued.push(TurnCommand {
            player_id,
            sequence,
            payload,
        });
    }

    /// Broadcast everything queued as the next turn. Returns the turn
    /// number, or `None` if nothing was sent (lobby, or nothing queued).
    pub fn flush_turn(&mut self) -> Option<TurnNumber> {
        if !self.started || self.queued.is_empty() {
            return None;
        }
        let mut commands = std::mem::take(&mut self.queued);
        commands.sort_by_key(|c| (c.player_id, c.sequence));
        self.last_turn = self.last_turn.next();
        let turn_number = self.last_turn;
        log::debug!(target: LOG_TARGET, "turn {} with {} commands", turn_number.0, commands.len());
        self.broadcast(&ServerMessage::Turn {
            turn_number,
            commands,
        });
        Some(turn_number)
    }

    /// Record a peer's world checksum after applying `turn`.
    pub fn record_checksum(&mut self, player_id: RelayPlayerId, turn: TurnNumber, hash: u64) {
        if !self.players.contains_key(&player_id) {
            return;
        }
        let reports = self.checksums.entry(turn).or_default();
        reports.insert(player_id, hash);
        if reports.len() >= self.players.len() {
            self.compare_checksums(turn);
        }
    }

    fn compare_checksums(&mut self, turn: TurnNumber) {
        let Some(reports) = self.checksums.remove(&turn) else {
            return;
        };
        let mut hashes = reports.values();
        let agree = match hashes.next() {
            Some(first) => hashes.all(|h| h == first),
            None => true,
        };
        if !agree {
            log::error!(target: LOG_TARGET, "desync at turn {}: {reports:?}", turn.0);
            self.broadcast(&ServerMessage::DesyncDetected { turn });
        }
        // Reports for older turns can no longer complete usefully.
        self.checksums.retain(|t, _| *t > turn);
    }

    /// Start the game. Only the host may, and only once.
    pub fn start_game(&mut self, player_id: RelayPlayerId, seed: u64, config_json: String) -> bool {
        if self.started || Some(player_id) != self.host_id {
            log::warn!(target: LOG_TARGET, "ignoring StartGame from {player_id}");
            return false;
        }
        self.started = true;
        log::info!(target: LOG_TARGET, "game started by {player_id} with seed {seed}");
        self.broadcast(&ServerMessage::GameStart { seed, config_json });
        true
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn host_id(&self) -> Option<RelayPlayerId> {
        self.host_id
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn last_turn(&self) -> TurnNumber {
        self.last_turn
    }

    pub fn player_list(&self) -> Vec<PlayerInfo> {
        self.players
            .iter()
            .map(|(id, peer)| PlayerInfo {
                id: *id,
                name: peer.name.clone(),
            })
            .collect()
    }

    /// Tear the session down, handing back every player's writer.
    pub fn into_writers(self) -> Vec<W> {
        self.players.into_values().map(|peer| peer.writer).collect()
    }

    /// Send `Rejected` on a writer that never became a player.
    pub fn reject(writer: &mut W, rejection: &JoinRejection) {
        log::warn!(target: LOG_TARGET, "rejected join: {rejection}");
        let msg = ServerMessage::Rejected {
            reason: rejection.to_string(),
        };
        if let Err(e) = send(writer, &msg) {
            log::debug!(target: LOG_TARGET, "could not deliver rejection: {e}");
        }
    }

    fn send_to(&mut self, player_id: RelayPlayerId, msg: &ServerMessage) {
        let Some(peer) = self.players.get_mut(&player_id) else {
            return;
        };
        if let Err(e) = send(&mut peer.writer, msg) {
            log::warn!(target: LOG_TARGET, "write to {player_id} failed: {e}");
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        for (id, peer) in &mut self.players {
            if let Err(e) = send(&mut peer.writer, msg) {
                log::warn!(target: LOG_TARGET, "write to {id} failed: {e}");
            }
        }
    }
}
