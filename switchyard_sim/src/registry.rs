// The command registry: a fixed table of per-opcode metadata.
//
// `COMMAND_TABLE` is indexed by opcode and holds, for every command, its
// display name, static `CommandFlags`, pause-level category and handler
// function. The table is a `static` built at compile time and never mutated,
// so every query is a bounds check plus an index.
//
// Callers must check `is_valid_command()` before asking for flags or names.
// Querying an invalid opcode is a programming error: it trips a
// `debug_assert!` and returns an empty/placeholder value in release builds.
//
// See also: `command.rs` for the `Command` enum whose discriminants index
// this table, `executor.rs` for how flags drive the check pipeline.

use crate::command::{COMMAND_COUNT, Command, CommandEnvelope, Opcode};
use crate::cost::CommandCost;
use crate::flags::{CommandFlags, CommandPauseLevel, CommandType, DoCommandFlags};
use crate::world::World;
use crate::{company, game, landscape, road, sign, town};
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Handler signature shared by every command. Handlers validate and cost the
/// envelope against the world, and mutate only when `EXEC` is set.
pub type CommandProc = fn(&mut World, DoCommandFlags, &CommandEnvelope) -> CommandCost;

/// Static metadata for one command type.
#[derive(Clone, Copy)]
pub struct CommandInfo {
    pub cmd: Command,
    pub name: &'static str,
    pub flags: CommandFlags,
    pub kind: CommandType,
    pub handler: CommandProc,
}

const fn info(
    cmd: Command,
    name: &'static str,
    flags: CommandFlags,
    kind: CommandType,
    handler: CommandProc,
) -> CommandInfo {
    CommandInfo {
        cmd,
        name,
        flags,
        kind,
        handler,
    }
}

const NONE: CommandFlags = CommandFlags::empty();

pub static COMMAND_TABLE: [CommandInfo; COMMAND_COUNT] = [
    info(
        Command::BuildRoad,
        "build_road",
        CommandFlags::NO_WATER.union(CommandFlags::AUTO),
        CommandType::LandscapeConstruction,
        road::cmd_build_road,
    ),
    info(
        Command::RemoveRoad,
        "remove_road",
        CommandFlags::AUTO,
        CommandType::LandscapeConstruction,
        road::cmd_remove_road,
    ),
    info(
        Command::BuildLongRoad,
        "build_long_road",
        CommandFlags::NO_WATER.union(CommandFlags::AUTO),
        CommandType::LandscapeConstruction,
        road::cmd_build_long_road,
    ),
    info(
        Command::LandscapeClear,
        "landscape_clear",
        NONE,
        CommandType::LandscapeConstruction,
        landscape::cmd_landscape_clear,
    ),
    info(
        Command::TerraformLand,
        "terraform_land",
        CommandFlags::ALL_TILES.union(CommandFlags::AUTO),
        CommandType::LandscapeConstruction,
        landscape::cmd_terraform_land,
    ),
    info(
        Command::FoundTown,
        "found_town",
        CommandFlags::NO_TEST,
        CommandType::LandscapeConstruction,
        town::cmd_found_town,
    ),
    info(
        Command::RenameTown,
        "rename_town",
        CommandFlags::SERVER,
        CommandType::OtherManagement,
        town::cmd_rename_town,
    ),
    info(
        Command::PlaceSign,
        "place_sign",
        CommandFlags::FREE_WHILE_PAUSED,
        CommandType::OtherManagement,
        sign::cmd_place_sign,
    ),
    info(
        Command::RenameSign,
        "rename_sign",
        CommandFlags::FREE_WHILE_PAUSED,
        CommandType::OtherManagement,
        sign::cmd_rename_sign,
    ),
    info(
        Command::GiveMoney,
        "give_money",
        NONE,
        CommandType::MoneyManagement,
        company::cmd_give_money,
    ),
    info(
        Command::Pause,
        "pause",
        CommandFlags::SERVER
            .union(CommandFlags::NO_EST)
            .union(CommandFlags::PAUSE_OK),
        CommandType::ServerSetting,
        game::cmd_pause,
    ),
    info(
        Command::ChangeSetting,
        "change_setting",
        CommandFlags::SERVER,
        CommandType::ServerSetting,
        game::cmd_change_setting,
    ),
    info(
        Command::MoneyCheat,
        "money_cheat",
        CommandFlags::OFFLINE,
        CommandType::Cheat,
        company::cmd_money_cheat,
    ),
    info(
        Command::SetBookmark,
        "set_bookmark",
        CommandFlags::LOCAL
            .union(CommandFlags::PAUSE_OK)
            .union(CommandFlags::SPECTATOR),
        CommandType::OtherManagement,
        game::cmd_set_bookmark,
    ),
];

/// Whether `op` names a registered command.
pub fn is_valid_command(op: Opcode) -> bool {
    (op as usize) < COMMAND_COUNT
}

/// Table entry for `op`, if valid.
pub fn command_info(op: Opcode) -> Option<&'static CommandInfo> {
    COMMAND_TABLE.get(usize::try_from(op).ok()?)
}

pub fn get_command_flags(op: Opcode) -> CommandFlags {
    debug_assert!(is_valid_command(op), "flags queried for invalid opcode {op}");
    command_info(op).map_or(CommandFlags::empty(), |info| info.flags)
}

pub fn get_command_name(op: Opcode) -> &'static str {
    debug_assert!(is_valid_command(op), "name queried for invalid opcode {op}");
    command_info(op).map_or("<invalid command>", |info| info.name)
}

/// Whether the command carries `PAUSE_OK` and may always run while paused.
pub fn is_command_allowed_while_paused(op: Opcode) -> bool {
    get_command_flags(op).contains(CommandFlags::PAUSE_OK)
}

/// Whether the command's category may run while paused at the given
/// `command_pause_level` setting.
pub fn is_allowed_at_pause_level(op: Opcode, level: CommandPauseLevel) -> bool {
    debug_assert!(is_valid_command(op), "pause level queried for invalid opcode {op}");
    command_info(op).is_some_and(|info| info.kind.required_pause_level() <= level)
}

/// Fingerprint of the command table. Peers exchange it in the relay
/// handshake; two builds that number or flag commands differently must not
/// share a session.
pub fn command_table_hash() -> u64 {
    let mut hasher = FxHasher::default();
    for info in &COMMAND_TABLE {
        hasher.write_u32(info.cmd.opcode());
        hasher.write(info.name.as_bytes());
        hasher.write_u16(info.flags.bits());
        hasher.write(format!("{:?}", info.kind).as_bytes());
    }
    hasher.finish()
}
