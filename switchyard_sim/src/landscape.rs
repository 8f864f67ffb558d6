// Landscape handlers: clearing tiles and terraforming.
//
// `clear_tile()` is the shared first step of every construction handler. It
// validates the tile against the dispatch flags (`ALL_TILES`, `NO_WATER`,
// `AUTO`), prices the demolition of whatever occupies it, and clears it when
// `EXEC` is set. Handlers add their own price on top of the clearing cost.
//
// Every handler here follows the same discipline: all validation and costing
// happens first, against an unmodified world; mutation happens last and only
// when `EXEC` is present. The executor's test run relies on this.

use crate::command::CommandEnvelope;
use crate::cost::{CMD_ERROR, CommandCost};
use crate::flags::DoCommandFlags;
use crate::strings::*;
use crate::types::{CompanyId, ExpensesType, TileIndex};
use crate::world::{TileKind, World};

/// Price and (with `EXEC`) perform the demolition of whatever is on `tile`.
pub fn clear_tile(
    world: &mut World,
    flags: DoCommandFlags,
    tile: TileIndex,
    company: CompanyId,
) -> CommandCost {
    let Some(current) = world.map.tile(tile).copied() else {
        return CMD_ERROR;
    };
    if !flags.contains(DoCommandFlags::ALL_TILES) && world.map.is_border(tile) {
        return CommandCost::error(ERROR_TOO_CLOSE_TO_EDGE_OF_MAP);
    }

    let prices = &world.config.prices;
    let price = match current.kind {
        TileKind::Clear => prices.clear_grass,
        TileKind::Water => {
            if flags.contains(DoCommandFlags::NO_WATER) {
                return CommandCost::error(ERROR_CAN_T_BUILD_ON_WATER);
            }
            // Nothing to demolish; the tile stays water.
            return CommandCost::with_cost(ExpensesType::Construction, 0);
        }
        TileKind::Road => {
            if flags.contains(DoCommandFlags::AUTO) {
                return CommandCost::error(ERROR_MUST_REMOVE_ROAD_FIRST);
            }
            if !current.owner.is_spectator()
                && current.owner != company
                && !flags.contains(DoCommandFlags::FORCE)
            {
                return CommandCost::error(ERROR_OWNED_BY_ANOTHER_COMPANY);
            }
            prices.clear_road
        }
        TileKind::House { .. } => {
            if flags.contains(DoCommandFlags::AUTO) {
                return CommandCost::error(ERROR_BUILDING_MUST_BE_DEMOLISHED);
            }
            prices.clear_house
        }
    };

    if flags.contains(DoCommandFlags::EXEC) {
        if let Some(t) = world.map.tile_mut(tile) {
            t.kind = TileKind::Clear;
            t.owner = CompanyId::SPECTATOR;
        }
    }
    CommandCost::with_cost(ExpensesType::Construction, price)
}

/// `LandscapeClear`: demolish whatever is on `env.tile`.
pub fn cmd_landscape_clear(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    clear_tile(world, flags, env.tile, env.company)
}

/// `TerraformLand`: raise (`p1 == 1`) or lower (any other `p1`) a tile by
/// one level. Occupied tiles are cleared first unless `AUTO` is set.
/// Lowering to sea level floods the tile; raising water turns it to land.
pub fn cmd_terraform_land(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let raise = env.p1 == 1;
    let Some(current) = world.map.tile(env.tile).copied() else {
        return CMD_ERROR;
    };
    if !flags.contains(DoCommandFlags::ALL_TILES) && world.map.is_border(env.tile) {
        return CommandCost::error(ERROR_TOO_CLOSE_TO_EDGE_OF_MAP);
    }
    if raise && current.height >= world.config.max_height {
        return CommandCost::error(ERROR_TOO_HIGH);
    }
    if !raise && current.height == 0 {
        return CommandCost::error(ERROR_ALREADY_AT_SEA_LEVEL);
    }

    let mut cost = CommandCost::with_cost(ExpensesType::Construction, 0);
    if matches!(current.kind, TileKind::Road | TileKind::House { .. }) {
        // Test-mode clearing: the real clear happens below with the height change.
        let clear = clear_tile(world, flags - DoCommandFlags::EXEC, env.tile, env.company);
        if clear.failed() {
            return clear;
        }
        cost = cost.accumulate(clear);
    }
    cost.add_cost(world.config.prices.terraform);

    if flags.contains(DoCommandFlags::EXEC) {
        if let Some(t) = world.map.tile_mut(env.tile) {
            t.owner = CompanyId::SPECTATOR;
            if raise {
                t.height += 1;
                t.kind = TileKind::Clear;
            } else {
                t.height -= 1;
                t.kind = if t.height == 0 {
                    TileKind::Water
                } else {
                    TileKind::Clear
                };
            }
        }
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::config::GameConfig;

    fn world() -> World {
        World::new(GameConfig {
            map_size_x: 16,
            map_size_y: 16,
            ..GameConfig::default()
        })
    }

    fn interior() -> TileIndex {
        TileIndex::from_xy(5, 5, 16)
    }

    fn set_kind(world: &mut World, tile: TileIndex, kind: TileKind, owner: CompanyId) {
        let t = world.map.tile_mut(tile).unwrap();
        t.kind = kind;
        t.owner = owner;
    }

    #[test]
    fn clearing_grass_costs_clear_price() {
        let mut w = world();
        let res = clear_tile(&mut w, DoCommandFlags::empty(), interior(), CompanyId(0));
        assert_eq!(res.cost(), w.config.prices.clear_grass);
    }

    #[test]
    fn border_needs_all_tiles() {
        let mut w = world();
        let edge = TileIndex::from_xy(0, 5, 16);
        let res = clear_tile(&mut w, DoCommandFlags::empty(), edge, CompanyId(0));
        assert_eq!(res.error_message(), Some(ERROR_TOO_CLOSE_TO_EDGE_OF_MAP));
        let res = clear_tile(&mut w, DoCommandFlags::ALL_TILES, edge, CompanyId(0));
        assert!(res.succeeded());
    }

    #[test]
    fn water_rejected_with_no_water() {
        let mut w = world();
        set_kind(&mut w, interior(), TileKind::Water, CompanyId::SPECTATOR);
        let res = clear_tile(&mut w, DoCommandFlags::NO_WATER, interior(), CompanyId(0));
        assert_eq!(res.error_message(), Some(ERROR_CAN_T_BUILD_ON_WATER));
    }

    #[test]
    fn auto_refuses_to_demolish() {
        let mut w = world();
        set_kind(&mut w, interior(), TileKind::Road, CompanyId(0));
        let res = clear_tile(&mut w, DoCommandFlags::AUTO, interior(), CompanyId(0));
        assert_eq!(res.error_message(), Some(ERROR_MUST_REMOVE_ROAD_FIRST));

        let house = TileKind::House {
            town: crate::types::TownId(0),
        };
        set_kind(&mut w, interior(), house, CompanyId::SPECTATOR);
        let res = clear_tile(&mut w, DoCommandFlags::AUTO, interior(), CompanyId(0));
        assert_eq!(res.error_message(), Some(ERROR_BUILDING_MUST_BE_DEMOLISHED));
    }

    #[test]
    fn foreign_road_is_protected() {
        let mut w = world();
        set_kind(&mut w, interior(), TileKind::Road, CompanyId(1));
        let res = clear_tile(&mut w, DoCommandFlags::EXEC, interior(), CompanyId(0));
        assert_eq!(res.error_message(), Some(ERROR_OWNED_BY_ANOTHER_COMPANY));
        assert_eq!(w.map.tile(interior()).unwrap().kind, TileKind::Road);
    }

    #[test]
    fn clear_only_mutates_with_exec() {
        let mut w = world();
        set_kind(&mut w, interior(), TileKind::Road, CompanyId(0));
        let res = clear_tile(&mut w, DoCommandFlags::empty(), interior(), CompanyId(0));
        assert_eq!(res.cost(), w.config.prices.clear_road);
        assert_eq!(w.map.tile(interior()).unwrap().kind, TileKind::Road);

        clear_tile(&mut w, DoCommandFlags::EXEC, interior(), CompanyId(0));
        assert_eq!(w.map.tile(interior()).unwrap().kind, TileKind::Clear);
    }

    #[test]
    fn lowering_to_sea_level_floods() {
        let mut w = world();
        let env =
            CommandEnvelope::new(Command::TerraformLand, interior()).with_company(CompanyId(0));
        let res = cmd_terraform_land(&mut w, DoCommandFlags::EXEC, &env);
        assert_eq!(res.cost(), w.config.prices.terraform);
        let tile = w.map.tile(interior()).unwrap();
        assert_eq!(tile.height, 0);
        assert_eq!(tile.kind, TileKind::Water);

        let res = cmd_terraform_land(&mut w, DoCommandFlags::EXEC, &env);
        assert_eq!(res.error_message(), Some(ERROR_ALREADY_AT_SEA_LEVEL));
    }

    #[test]
    fn raising_stops_at_max_height() {
        let mut w = world();
        w.map.tile_mut(interior()).unwrap().height = w.config.max_height;
        let env = CommandEnvelope::new(Command::TerraformLand, interior()).with_params(1, 0);
        let res = cmd_terraform_land(&mut w, DoCommandFlags::empty(), &env);
        assert_eq!(res.error_message(), Some(ERROR_TOO_HIGH));
    }

    #[test]
    fn terraform_under_road_includes_clearing() {
        let mut w = world();
        set_kind(&mut w, interior(), TileKind::Road, CompanyId(0));
        let env = CommandEnvelope::new(Command::TerraformLand, interior())
            .with_params(1, 0)
            .with_company(CompanyId(0));
        let res = cmd_terraform_land(&mut w, DoCommandFlags::EXEC, &env);
        let prices = &w.config.prices;
        assert_eq!(res.cost(), prices.clear_road + prices.terraform);
        let tile = w.map.tile(interior()).unwrap();
        assert_eq!(tile.kind, TileKind::Clear);
        assert_eq!(tile.height, 2);
    }
}
