// Messages exchanged between peers and the relay.
//
// `ClientMessage` travels peer -> relay, `ServerMessage` relay -> peer. Both
// are serde enums framed by `framing.rs`. Command payloads are opaque bytes
// (an encoded `CommandPacket` from the sim crate); the relay only orders and
// forwards them, tagging each with the sender's `RelayPlayerId` so receivers
// never have to trust a self-declared issuer.
//
// Session lifecycle:
// 1. Peer sends `Hello`. The relay answers `Welcome` or `Rejected`.
// 2. The host (first player) sends `StartGame`; everyone gets `GameStart`
//    with the same seed and config, and builds an identical world.
// 3. Peers send `Command`s at will. On each turn tick the relay broadcasts
//    one `Turn` holding everything received since the previous turn, sorted
//    by `(player_id, sequence)`. Empty turns are not sent.
// 4. Peers periodically report `Checksum { turn, hash }` after applying a
//    turn. Mismatched hashes for the same turn produce `DesyncDetected`.
// 5. `Goodbye` (or a dropped connection) produces `PlayerLeft`.

use crate::types::{ActionSequence, RelayPlayerId, TurnNumber};
use serde::{Deserialize, Serialize};

/// Peer -> relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    Hello {
        protocol_version: u32,
        player_name: String,
        /// Hash of the command table as the peer sees it. Peers with
        /// different tables would interpret opcodes differently.
        sim_version_hash: u64,
        config_hash: u64,
        session_password: Option<String>,
    },
    Command {
        sequence: ActionSequence,
        payload: Vec<u8>,
    },
    Checksum {
        turn: TurnNumber,
        hash: u64,
    },
    /// Host only.
    StartGame {
        seed: u64,
        config_json: String,
    },
    Goodbye,
}

/// Relay -> peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    Welcome {
        player_id: RelayPlayerId,
        host_id: RelayPlayerId,
        session_name: String,
        players: Vec<PlayerInfo>,
        turn_duration_ms: u32,
    },
    Rejected {
        reason: String,
    },
    Turn {
        turn_number: TurnNumber,
        commands: Vec<TurnCommand>,
    },
    PlayerJoined {
        player: PlayerInfo,
    },
    PlayerLeft {
        player_id: RelayPlayerId,
        name: String,
    },
    DesyncDetected {
        turn: TurnNumber,
    },
    GameStart {
        seed: u64,
        config_json: String,
    },
}

/// One command inside a `Turn`, tagged by the relay with its sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCommand {
    pub player_id: RelayPlayerId,
    pub sequence: ActionSequence,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: RelayPlayerId,
    pub name: String,
}
