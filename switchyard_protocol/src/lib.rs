// switchyard_protocol — wire protocol between Switchyard peers and the relay.
//
// Shared by `switchyard_relay` and `switchyard_client`. Depends on neither the
// sim nor any transport beyond `std::io`.
//
// Module overview:
// - `types.rs`:    `RelayPlayerId`, `TurnNumber`, `ActionSequence`.
// - `message.rs`:  `ClientMessage` / `ServerMessage` and their payload structs.
// - `framing.rs`:  4-byte big-endian length-prefixed frames, JSON bodies.
//
// Command payloads are opaque `Vec<u8>`. The relay never decodes them, so the
// command set can grow without a protocol bump as long as every peer runs the
// same command table (checked via `sim_version_hash` in `Hello`).

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_FRAME_SIZE, read_frame, recv, send, write_frame};
pub use message::{ClientMessage, PlayerInfo, ServerMessage, TurnCommand};
pub use types::{ActionSequence, RelayPlayerId, TurnNumber};

/// Bumped on any incompatible change to the message enums.
pub const PROTOCOL_VERSION: u32 = 1;
