// Static per-command flags and dynamic per-call dispatch flags.
//
// `CommandFlags` are fixed in the command table (`registry.rs`) and describe
// what a command is allowed to do: who may issue it, whether it may run while
// paused, whether it is synchronised over the network, and which tile
// restrictions apply.
//
// `DoCommandFlags` are what a handler actually sees on one invocation. The
// executor derives them from the static flags (`command_flags_to_dc_flags`),
// merges the caller's flags in, and owns the `EXEC` bit: handlers compute
// cost without `EXEC` and only mutate state when it is present.
//
// `CommandType` groups commands for the `command_pause_level` game setting:
// while paused, a command runs if its category's required level is at or
// below the configured level (or if it carries `PAUSE_OK`).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Static capabilities and restrictions of one command type.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CommandFlags: u16 {
        /// Only the session host may issue this command.
        const SERVER = 1 << 0;
        /// May be issued without a company.
        const SPECTATOR = 1 << 1;
        /// Only allowed outside a replicated session.
        const OFFLINE = 1 << 2;
        /// Refuse to clear existing structures implicitly.
        const AUTO = 1 << 3;
        /// Allow map-border tiles.
        const ALL_TILES = 1 << 4;
        /// Refuse water tiles.
        const NO_WATER = 1 << 5;
        /// Test run and exec run may legitimately produce different results.
        const NO_TEST = 1 << 6;
        /// Cost-estimate requests are ignored; the command always executes.
        const NO_EST = 1 << 7;
        /// Allowed while the game is paused.
        const PAUSE_OK = 1 << 8;
        /// Allowed while paused only if the test run costs nothing.
        const FREE_WHILE_PAUSED = 1 << 9;
        /// Not synchronised: executed on the issuing peer only.
        const LOCAL = 1 << 10;
        /// Text payload may contain control characters.
        const STR_CTRL = 1 << 11;
    }
}

bitflags! {
    /// Flags for one handler invocation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DoCommandFlags: u16 {
        /// Execute for real. Without it the handler only validates and costs.
        const EXEC = 1 << 0;
        /// Refuse to clear existing structures implicitly.
        const AUTO = 1 << 1;
        /// The caller only wants a cost estimate.
        const QUERY_COST = 1 << 2;
        /// Refuse water tiles.
        const NO_WATER = 1 << 3;
        /// Allow map-border tiles.
        const ALL_TILES = 1 << 4;
        /// Override soft restrictions (used by scripted and town actions).
        const FORCE = 1 << 5;
        /// Do not show an error popup if the request fails. Handlers ignore it.
        const NO_ERROR_POPUP = 1 << 6;
    }
}

impl DoCommandFlags {
    /// Caller flags that change what a handler does. They travel with a
    /// replicated command so every peer runs it the way the sender tested it.
    pub const REPLICATED: Self = Self::AUTO
        .union(Self::NO_WATER)
        .union(Self::ALL_TILES)
        .union(Self::FORCE);
}

/// Derive the handler-visible tile restriction flags from a command's static
/// flags. Only the water, auto and all-tiles bits carry over.
pub const fn command_flags_to_dc_flags(cmd_flags: CommandFlags) -> DoCommandFlags {
    let mut flags = DoCommandFlags::empty();
    if cmd_flags.contains(CommandFlags::NO_WATER) {
        flags = flags.union(DoCommandFlags::NO_WATER);
    }
    if cmd_flags.contains(CommandFlags::AUTO) {
        flags = flags.union(DoCommandFlags::AUTO);
    }
    if cmd_flags.contains(CommandFlags::ALL_TILES) {
        flags = flags.union(DoCommandFlags::ALL_TILES);
    }
    flags
}

/// Category of a command, for the pause-level rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandType {
    LandscapeConstruction,
    MoneyManagement,
    OtherManagement,
    CompanySetting,
    ServerSetting,
    Cheat,
}

impl CommandType {
    /// The lowest `command_pause_level` at which this category may run while
    /// the game is paused.
    pub const fn required_pause_level(self) -> CommandPauseLevel {
        match self {
            CommandType::LandscapeConstruction => CommandPauseLevel::AllActions,
            CommandType::MoneyManagement => CommandPauseLevel::NoLandscaping,
            CommandType::OtherManagement => CommandPauseLevel::NoConstruction,
            CommandType::CompanySetting | CommandType::ServerSetting | CommandType::Cheat => {
                CommandPauseLevel::NoActions
            }
        }
    }
}

/// How much may be done while the game is paused. Ordered from most to
/// least restrictive.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CommandPauseLevel {
    /// Only settings, cheats and `PAUSE_OK` commands.
    NoActions,
    /// Additionally, management that builds nothing.
    #[default]
    NoConstruction,
    /// Additionally, money management.
    NoLandscaping,
    /// Everything, including landscaping.
    AllActions,
}

impl CommandPauseLevel {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::NoActions),
            1 => Some(Self::NoConstruction),
            2 => Some(Self::NoLandscaping),
            3 => Some(Self::AllActions),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_flags_carry_over() {
        let flags = command_flags_to_dc_flags(
            CommandFlags::NO_WATER | CommandFlags::AUTO | CommandFlags::ALL_TILES,
        );
        assert_eq!(
            flags,
            DoCommandFlags::NO_WATER | DoCommandFlags::AUTO | DoCommandFlags::ALL_TILES
        );
    }

    #[test]
    fn other_flags_do_not_leak() {
        let flags = command_flags_to_dc_flags(
            CommandFlags::SERVER
                | CommandFlags::PAUSE_OK
                | CommandFlags::LOCAL
                | CommandFlags::NO_TEST,
        );
        assert!(flags.is_empty());
    }

    #[test]
    fn pause_levels_are_ordered() {
        assert!(CommandPauseLevel::NoActions < CommandPauseLevel::NoConstruction);
        assert!(CommandPauseLevel::NoLandscaping < CommandPauseLevel::AllActions);
        assert_eq!(
            CommandPauseLevel::from_index(3),
            Some(CommandPauseLevel::AllActions)
        );
        assert_eq!(CommandPauseLevel::from_index(4), None);
    }

    #[test]
    fn settings_always_run_while_paused() {
        assert_eq!(
            CommandType::ServerSetting.required_pause_level(),
            CommandPauseLevel::NoActions
        );
        assert_eq!(
            CommandType::LandscapeConstruction.required_pause_level(),
            CommandPauseLevel::AllActions
        );
    }
}
