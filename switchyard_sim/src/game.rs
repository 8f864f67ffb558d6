// Game-level handlers: pause, runtime settings and local bookmarks.
//
// `Pause` and `ChangeSetting` are `SERVER` commands; authority is enforced by
// the dispatcher, not here. `SetBookmark` is `LOCAL`: it only touches
// `World::local`, which is never replicated or checksummed.

use crate::command::CommandEnvelope;
use crate::cost::{CMD_ERROR, CommandCost};
use crate::flags::{CommandPauseLevel, DoCommandFlags};
use crate::types::PauseMode;
use crate::world::World;

/// Index of each runtime setting for `ChangeSetting`'s `p1`.
pub const SETTING_COMMAND_PAUSE_LEVEL: u32 = 0;
pub const SETTING_TOWN_MIN_DISTANCE: u32 = 1;
pub const SETTING_GIVE_MONEY: u32 = 2;

/// `Pause`: set (`p2 != 0`) or clear the pause reason given by `p1`.
pub fn cmd_pause(world: &mut World, flags: DoCommandFlags, env: &CommandEnvelope) -> CommandCost {
    let mode = u8::try_from(env.p1)
        .ok()
        .and_then(PauseMode::from_bits)
        .filter(|m| m.bits().count_ones() == 1);
    let Some(mode) = mode else {
        return CMD_ERROR;
    };

    if flags.contains(DoCommandFlags::EXEC) {
        let was_paused = world.pause_mode.is_paused();
        world.pause_mode.set(mode, env.p2 != 0);
        let now_paused = world.pause_mode.is_paused();
        if was_paused != now_paused {
            log::info!(
                target: "switchyard::game",
                "game {} by {}",
                if now_paused { "paused" } else { "unpaused" },
                env.company
            );
        }
    }
    CommandCost::new()
}

/// `ChangeSetting`: set runtime setting `p1` to `p2`.
pub fn cmd_change_setting(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let exec = flags.contains(DoCommandFlags::EXEC);
    match env.p1 {
        SETTING_COMMAND_PAUSE_LEVEL => {
            let Some(level) = CommandPauseLevel::from_index(env.p2) else {
                return CMD_ERROR;
            };
            if exec {
                world.settings.command_pause_level = level;
            }
        }
        SETTING_TOWN_MIN_DISTANCE => {
            if exec {
                world.settings.town_min_distance = env.p2;
            }
        }
        SETTING_GIVE_MONEY => {
            if exec {
                world.settings.give_money = env.p2 != 0;
            }
        }
        _ => return CMD_ERROR,
    }
    CommandCost::new()
}

/// `SetBookmark`: remember `env.tile` in bookmark slot `p1`.
pub fn cmd_set_bookmark(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    if !world.map.contains(env.tile) {
        return CMD_ERROR;
    }
    if flags.contains(DoCommandFlags::EXEC) {
        world.local.bookmarks.insert(env.p1, env.tile);
    }
    CommandCost::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::config::GameConfig;
    use crate::types::TileIndex;

    fn pause(mode: PauseMode, on: bool) -> CommandEnvelope {
        CommandEnvelope::new(Command::Pause, TileIndex::INVALID)
            .with_params(u32::from(mode.bits()), u32::from(on))
    }

    #[test]
    fn pause_reasons_stack() {
        let mut w = World::new(GameConfig::default());
        cmd_pause(&mut w, DoCommandFlags::EXEC, &pause(PauseMode::NORMAL, true));
        cmd_pause(&mut w, DoCommandFlags::EXEC, &pause(PauseMode::JOIN, true));
        cmd_pause(&mut w, DoCommandFlags::EXEC, &pause(PauseMode::NORMAL, false));
        assert_eq!(w.pause_mode, PauseMode::JOIN);
        assert!(w.pause_mode.is_paused());
    }

    #[test]
    fn pause_rejects_combined_or_unknown_bits() {
        let mut w = World::new(GameConfig::default());
        let both = pause(PauseMode::NORMAL | PauseMode::JOIN, true);
        assert!(cmd_pause(&mut w, DoCommandFlags::EXEC, &both).failed());
        let unknown = CommandEnvelope::new(Command::Pause, TileIndex::INVALID).with_params(0x80, 1);
        assert!(cmd_pause(&mut w, DoCommandFlags::EXEC, &unknown).failed());
        assert!(!w.pause_mode.is_paused());
    }

    #[test]
    fn pause_test_run_does_not_pause() {
        let mut w = World::new(GameConfig::default());
        cmd_pause(&mut w, DoCommandFlags::empty(), &pause(PauseMode::NORMAL, true));
        assert!(!w.pause_mode.is_paused());
    }

    #[test]
    fn change_settings() {
        let mut w = World::new(GameConfig::default());
        let set = |p1, p2| {
            CommandEnvelope::new(Command::ChangeSetting, TileIndex::INVALID).with_params(p1, p2)
        };
        assert!(cmd_change_setting(&mut w, DoCommandFlags::EXEC, &set(0, 3)).succeeded());
        assert_eq!(w.settings.command_pause_level, CommandPauseLevel::AllActions);
        assert!(cmd_change_setting(&mut w, DoCommandFlags::EXEC, &set(2, 0)).succeeded());
        assert!(!w.settings.give_money);
        assert!(cmd_change_setting(&mut w, DoCommandFlags::EXEC, &set(0, 9)).failed());
        assert!(cmd_change_setting(&mut w, DoCommandFlags::EXEC, &set(7, 0)).failed());
    }

    #[test]
    fn bookmark_is_local_state() {
        let mut w = World::new(GameConfig::default());
        let sum = w.checksum();
        let env = CommandEnvelope::new(Command::SetBookmark, TileIndex(9)).with_params(2, 0);
        assert!(cmd_set_bookmark(&mut w, DoCommandFlags::EXEC, &env).succeeded());
        assert_eq!(w.local.bookmarks[&2], TileIndex(9));
        assert_eq!(w.checksum(), sum);
    }
}
