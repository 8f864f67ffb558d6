// Command identities and the command envelope.
//
// Every mutation of game state is expressed as a `CommandEnvelope`: an opcode
// (`Command`), a target tile, two generic 32-bit parameters, an optional text
// payload, the source tag and the issuing company. The envelope is the only
// input a handler receives besides the world and its dispatch flags, and it
// is the unit that the replication layer puts on the wire.
//
// The full flow for a player action:
//   UI / script → `CommandDispatcher::request_command()` (dispatch.rs) →
//   either `Executor::execute()` directly (offline, LOCAL commands) or an
//   encoded `CommandPacket` in the outbox (replicated session) → the relay
//   orders it into a turn → every peer runs `apply_replicated()`.
//
// See also: `registry.rs` for the per-opcode metadata table, `executor.rs`
// for the check pipeline, `replication.rs` for the wire record.
//
// **Critical constraint: determinism.** Envelopes are plain data. Handlers
// must derive every decision from the envelope and the world, nothing else.

use crate::types::{CompanyId, TileIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric command identifier as carried on the wire.
pub type Opcode = u32;

/// Every command type known to the registry. The discriminant is the opcode
/// and indexes `COMMAND_TABLE`; new commands are appended at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Command {
    BuildRoad,
    RemoveRoad,
    BuildLongRoad,
    LandscapeClear,
    TerraformLand,
    FoundTown,
    RenameTown,
    PlaceSign,
    RenameSign,
    GiveMoney,
    Pause,
    ChangeSetting,
    MoneyCheat,
    SetBookmark,
}

/// Number of registered command types. Any opcode `>= COMMAND_COUNT` is invalid.
pub const COMMAND_COUNT: usize = 14;

impl Command {
    /// All commands in opcode order.
    pub const ALL: [Command; COMMAND_COUNT] = [
        Command::BuildRoad,
        Command::RemoveRoad,
        Command::BuildLongRoad,
        Command::LandscapeClear,
        Command::TerraformLand,
        Command::FoundTown,
        Command::RenameTown,
        Command::PlaceSign,
        Command::RenameSign,
        Command::GiveMoney,
        Command::Pause,
        Command::ChangeSetting,
        Command::MoneyCheat,
        Command::SetBookmark,
    ];

    pub const fn opcode(self) -> Opcode {
        self as Opcode
    }

    /// Map an opcode back to its command, or `None` if out of range.
    pub fn from_opcode(op: Opcode) -> Option<Command> {
        Self::ALL.get(usize::try_from(op).ok()?).copied()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::registry::get_command_name(self.opcode()))
    }
}

/// Where a request came from. Only `SelfIssued` requests produce error
/// popups for the local player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandSource {
    /// The local player, through the UI.
    #[default]
    SelfIssued,
    /// An AI or script acting for a company.
    Other,
    /// Re-issued from a replicated packet.
    Network,
}

/// The full input to one command attempt.
///
/// Built with `CommandEnvelope::new(cmd, tile)` and the consuming `with_*`
/// builders; never modified once handed to the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub tile: TileIndex,
    pub p1: u32,
    pub p2: u32,
    pub cmd: Command,
    pub text: Option<String>,
    pub source: CommandSource,
    pub company: CompanyId,
}

impl CommandEnvelope {
    pub fn new(cmd: Command, tile: TileIndex) -> Self {
        Self {
            tile,
            p1: 0,
            p2: 0,
            cmd,
            text: None,
            source: CommandSource::SelfIssued,
            company: CompanyId::SPECTATOR,
        }
    }

    pub fn with_params(mut self, p1: u32, p2: u32) -> Self {
        self.p1 = p1;
        self.p2 = p2;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_company(mut self, company: CompanyId) -> Self {
        self.company = company;
        self
    }

    /// The text payload, or `""` when absent.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_match_all_order() {
        for (i, cmd) in Command::ALL.iter().enumerate() {
            assert_eq!(cmd.opcode() as usize, i);
            assert_eq!(Command::from_opcode(i as Opcode), Some(*cmd));
        }
    }

    #[test]
    fn out_of_range_opcode_is_none() {
        assert_eq!(Command::from_opcode(COMMAND_COUNT as Opcode), None);
        assert_eq!(Command::from_opcode(u32::MAX), None);
    }

    #[test]
    fn envelope_builders() {
        let env = CommandEnvelope::new(Command::PlaceSign, TileIndex(42))
            .with_params(1, 2)
            .with_text("depot")
            .with_source(CommandSource::Other)
            .with_company(CompanyId(3));
        assert_eq!(env.tile, TileIndex(42));
        assert_eq!((env.p1, env.p2), (1, 2));
        assert_eq!(env.text_or_empty(), "depot");
        assert_eq!(env.source, CommandSource::Other);
        assert_eq!(env.company, CompanyId(3));
    }

    #[test]
    fn envelope_serialization_roundtrip() {
        let env = CommandEnvelope::new(Command::BuildRoad, TileIndex(7)).with_company(CompanyId(0));
        let json = serde_json::to_string(&env).unwrap();
        let restored: CommandEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env, restored);
    }
}
