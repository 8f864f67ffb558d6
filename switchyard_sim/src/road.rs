// Road handlers: single road pieces and straight road runs.
//
// `BuildLongRoad` is the reference example of a compound command. It issues
// one `BuildRoad` sub-command per tile through `executor::do_command()` and
// folds the results with `CommandCost::accumulate`, so the first failing tile
// aborts the whole run. Because the test run issues the same sub-commands
// without `EXEC`, the run is only committed once every tile is known to be
// buildable and affordable.

use crate::command::{Command, CommandEnvelope};
use crate::cost::{CMD_ERROR, CommandCost};
use crate::executor::do_command;
use crate::flags::DoCommandFlags;
use crate::landscape::clear_tile;
use crate::strings::*;
use crate::types::{CompanyId, ExpensesType, TileIndex};
use crate::world::{TileKind, World};

/// `BuildRoad`: build a road piece on `env.tile`, clearing it first.
pub fn cmd_build_road(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let Some(current) = world.map.tile(env.tile).copied() else {
        return CMD_ERROR;
    };
    match current.kind {
        TileKind::Road => return CommandCost::error(ERROR_ALREADY_BUILT),
        TileKind::Water => return CommandCost::error(ERROR_CAN_T_BUILD_ON_WATER),
        _ => {}
    }

    let mut cost = clear_tile(world, flags, env.tile, env.company);
    if cost.failed() {
        return cost;
    }
    cost.add_cost(world.config.prices.build_road);

    if flags.contains(DoCommandFlags::EXEC) {
        if let Some(t) = world.map.tile_mut(env.tile) {
            t.kind = TileKind::Road;
            t.owner = env.company;
        }
    }
    cost
}

/// `RemoveRoad`: remove a road piece owned by the issuer (or by nobody).
pub fn cmd_remove_road(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let Some(current) = world.map.tile(env.tile).copied() else {
        return CMD_ERROR;
    };
    if current.kind != TileKind::Road {
        return CommandCost::error(ERROR_THERE_IS_NO_ROAD);
    }
    if !current.owner.is_spectator()
        && current.owner != env.company
        && !flags.contains(DoCommandFlags::FORCE)
    {
        return CommandCost::error(ERROR_OWNED_BY_ANOTHER_COMPANY);
    }

    if flags.contains(DoCommandFlags::EXEC) {
        if let Some(t) = world.map.tile_mut(env.tile) {
            t.kind = TileKind::Clear;
            t.owner = CompanyId::SPECTATOR;
        }
    }
    CommandCost::with_cost(ExpensesType::Construction, world.config.prices.remove_road)
}

/// Tiles on the straight line from `start` to `end`, inclusive, or `None` if
/// the two are not in the same row or column.
fn tiles_in_line(world: &World, start: TileIndex, end: TileIndex) -> Option<Vec<TileIndex>> {
    let size_x = world.map.size_x;
    let (sx, sy) = (start.x(size_x), start.y(size_x));
    let (ex, ey) = (end.x(size_x), end.y(size_x));
    if sx == ex {
        let (lo, hi) = (sy.min(ey), sy.max(ey));
        Some((lo..=hi).map(|y| TileIndex::from_xy(sx, y, size_x)).collect())
    } else if sy == ey {
        let (lo, hi) = (sx.min(ex), sx.max(ex));
        Some((lo..=hi).map(|x| TileIndex::from_xy(x, sy, size_x)).collect())
    } else {
        None
    }
}

/// `BuildLongRoad`: build road on every tile from `env.tile` to the tile
/// index in `p1`. Tiles that already carry road are skipped.
pub fn cmd_build_long_road(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let end = TileIndex(env.p1);
    if !world.map.contains(env.tile) || !world.map.contains(end) {
        return CMD_ERROR;
    }
    let Some(tiles) = tiles_in_line(world, env.tile, end) else {
        return CommandCost::error(ERROR_START_AND_END_MUST_BE_IN_LINE);
    };

    let mut total = CommandCost::new();
    let mut built = 0u32;
    for tile in tiles {
        if world.map.tile(tile).is_some_and(|t| t.kind == TileKind::Road) {
            continue;
        }
        let sub = CommandEnvelope::new(Command::BuildRoad, tile)
            .with_source(env.source)
            .with_company(env.company);
        total = total.accumulate(do_command(world, &sub, flags));
        if total.failed() {
            return total;
        }
        built += 1;
    }

    if built == 0 {
        return CommandCost::error(ERROR_ALREADY_BUILT);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn world() -> World {
        World::new(GameConfig {
            map_size_x: 16,
            map_size_y: 16,
            ..GameConfig::default()
        })
    }

    fn road_env(tile: TileIndex) -> CommandEnvelope {
        CommandEnvelope::new(Command::BuildRoad, tile).with_company(CompanyId(0))
    }

    #[test]
    fn build_road_costs_clear_plus_build() {
        let mut w = world();
        let tile = TileIndex(42);
        let res = cmd_build_road(&mut w, DoCommandFlags::EXEC, &road_env(tile));
        assert_eq!(res.cost(), 500);
        let t = w.map.tile(tile).unwrap();
        assert_eq!(t.kind, TileKind::Road);
        assert_eq!(t.owner, CompanyId(0));
    }

    #[test]
    fn second_build_is_already_built() {
        let mut w = world();
        let tile = TileIndex(42);
        cmd_build_road(&mut w, DoCommandFlags::EXEC, &road_env(tile));
        let res = cmd_build_road(&mut w, DoCommandFlags::EXEC, &road_env(tile));
        assert_eq!(res.error_message(), Some(ERROR_ALREADY_BUILT));
    }

    #[test]
    fn remove_road_checks_owner() {
        let mut w = world();
        let tile = TileIndex(42);
        cmd_build_road(&mut w, DoCommandFlags::EXEC, &road_env(tile));

        let foreign = CommandEnvelope::new(Command::RemoveRoad, tile).with_company(CompanyId(1));
        let res = cmd_remove_road(&mut w, DoCommandFlags::EXEC, &foreign);
        assert_eq!(res.error_message(), Some(ERROR_OWNED_BY_ANOTHER_COMPANY));

        let own = CommandEnvelope::new(Command::RemoveRoad, tile).with_company(CompanyId(0));
        let res = cmd_remove_road(&mut w, DoCommandFlags::EXEC, &own);
        assert!(res.succeeded());
        assert_eq!(w.map.tile(tile).unwrap().kind, TileKind::Clear);

        let res = cmd_remove_road(&mut w, DoCommandFlags::EXEC, &own);
        assert_eq!(res.error_message(), Some(ERROR_THERE_IS_NO_ROAD));
    }

    #[test]
    fn long_road_sums_sub_commands_and_skips_existing() {
        let mut w = world();
        let start = TileIndex::from_xy(2, 4, 16);
        let end = TileIndex::from_xy(6, 4, 16);
        cmd_build_road(&mut w, DoCommandFlags::EXEC, &road_env(TileIndex::from_xy(4, 4, 16)));

        let env = CommandEnvelope::new(Command::BuildLongRoad, start)
            .with_params(end.0, 0)
            .with_company(CompanyId(0));
        let res = cmd_build_long_road(&mut w, DoCommandFlags::EXEC, &env);
        assert_eq!(res.cost(), 4 * 500);
        for x in 2..=6 {
            let t = w.map.tile(TileIndex::from_xy(x, 4, 16)).unwrap();
            assert_eq!(t.kind, TileKind::Road);
        }
    }

    #[test]
    fn long_road_stops_at_first_failure_without_mutating_in_test_mode() {
        let mut w = world();
        let start = TileIndex::from_xy(2, 4, 16);
        let end = TileIndex::from_xy(6, 4, 16);
        w.map.tile_mut(TileIndex::from_xy(5, 4, 16)).unwrap().kind = TileKind::Water;

        let env = CommandEnvelope::new(Command::BuildLongRoad, start)
            .with_params(end.0, 0)
            .with_company(CompanyId(0));
        let res = cmd_build_long_road(&mut w, DoCommandFlags::NO_WATER, &env);
        assert_eq!(res.error_message(), Some(ERROR_CAN_T_BUILD_ON_WATER));
        assert_eq!(
            w.map.tile(start).unwrap().kind,
            TileKind::Clear,
            "test run must not build"
        );
    }

    #[test]
    fn long_road_requires_a_straight_line() {
        let mut w = world();
        let env = CommandEnvelope::new(Command::BuildLongRoad, TileIndex::from_xy(2, 2, 16))
            .with_params(TileIndex::from_xy(4, 5, 16).0, 0);
        let res = cmd_build_long_road(&mut w, DoCommandFlags::empty(), &env);
        assert_eq!(res.error_message(), Some(ERROR_START_AND_END_MUST_BE_IN_LINE));
    }

    #[test]
    fn long_road_over_existing_road_is_already_built() {
        let mut w = world();
        let tile = TileIndex::from_xy(3, 3, 16);
        cmd_build_road(&mut w, DoCommandFlags::EXEC, &road_env(tile));
        let env = CommandEnvelope::new(Command::BuildLongRoad, tile).with_params(tile.0, 0);
        let res = cmd_build_long_road(&mut w, DoCommandFlags::empty(), &env);
        assert_eq!(res.error_message(), Some(ERROR_ALREADY_BUILT));
    }
}
