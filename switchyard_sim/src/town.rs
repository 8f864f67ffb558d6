// Town handlers.
//
// `FoundTown` is flagged `NO_TEST`: in the exec run it also lays approach
// roads around the new town centre (issued as sub-commands on behalf of no
// company) and adds their cost to the founding price, so the two runs
// legitimately report different costs. The executor's funds check only saw
// the founding price; the exec run checks the full cost again before it
// commits anything.

use crate::command::{Command, CommandEnvelope};
use crate::cost::{CMD_ERROR, CommandCost};
use crate::executor::{do_command, get_available_money_for_command};
use crate::flags::DoCommandFlags;
use crate::strings::*;
use crate::types::{CompanyId, ExpensesType, TileIndex, TownId};
use crate::world::{TileKind, Town, World};

fn validate_name(world: &World, name: &str, renaming: Option<TownId>) -> Option<CommandCost> {
    if name.is_empty() {
        return Some(CMD_ERROR);
    }
    if name.len() > world.config.max_text_len {
        return Some(CommandCost::error(ERROR_TEXT_TOO_LONG));
    }
    let taken = world
        .towns
        .iter()
        .any(|(id, town)| Some(*id) != renaming && town.name == name);
    taken.then_some(CommandCost::error(ERROR_NAME_MUST_BE_UNIQUE))
}

fn approach_road(tile: TileIndex) -> CommandEnvelope {
    CommandEnvelope::new(Command::BuildRoad, tile).with_company(CompanyId::SPECTATOR)
}

/// `FoundTown`: found a town named `env.text` centred on `env.tile`.
pub fn cmd_found_town(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let Some(centre) = world.map.tile(env.tile).copied() else {
        return CMD_ERROR;
    };
    let name = env.text_or_empty();
    if let Some(err) = validate_name(world, name, None) {
        return err;
    }
    if world.map.is_border(env.tile) {
        return CommandCost::error(ERROR_TOO_CLOSE_TO_EDGE_OF_MAP);
    }
    if centre.kind != TileKind::Clear {
        return CommandCost::error(ERROR_SITE_UNSUITABLE);
    }
    let min_distance = world.settings.town_min_distance;
    let crowded = world
        .towns
        .values()
        .any(|town| world.map.distance_manhattan(town.center, env.tile) < min_distance);
    if crowded {
        return CommandCost::error(ERROR_TOO_CLOSE_TO_ANOTHER_TOWN);
    }

    let mut cost =
        CommandCost::with_cost(ExpensesType::Construction, world.config.prices.found_town);
    if !flags.contains(DoCommandFlags::EXEC) {
        return cost;
    }

    let road_flags = DoCommandFlags::AUTO | DoCommandFlags::NO_WATER;
    let neighbours: Vec<_> = world.map.neighbours(env.tile).collect();
    let mut planned = cost;
    let mut approaches = Vec::new();
    for tile in neighbours {
        let road = do_command(world, &approach_road(tile), road_flags);
        if road.succeeded() {
            planned.add_cost(road.cost());
            approaches.push(tile);
        }
    }
    if planned.cost() > get_available_money_for_command(world, env.company) {
        return CommandCost::error(ERROR_NOT_ENOUGH_CASH_REQUIRES_X);
    }

    let id = world.add_town(Town {
        name: name.to_owned(),
        center: env.tile,
    });
    if let Some(t) = world.map.tile_mut(env.tile) {
        t.kind = TileKind::House { town: id };
        t.owner = CompanyId::SPECTATOR;
    }
    for tile in approaches {
        let road = do_command(world, &approach_road(tile), road_flags | DoCommandFlags::EXEC);
        if road.succeeded() {
            cost.add_cost(road.cost());
        }
    }
    log::info!(
        target: "switchyard::town",
        "{} founded town {name:?} at {}",
        env.company,
        env.tile
    );
    cost
}

/// `RenameTown`: give town `p1` the name in `env.text`.
pub fn cmd_rename_town(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let id = TownId(env.p1);
    if !world.towns.contains_key(&id) {
        return CMD_ERROR;
    }
    let name = env.text_or_empty();
    if let Some(err) = validate_name(world, name, Some(id)) {
        return err;
    }
    if flags.contains(DoCommandFlags::EXEC) {
        if let Some(town) = world.towns.get_mut(&id) {
            town.name = name.to_owned();
        }
    }
    CommandCost::new()
}
