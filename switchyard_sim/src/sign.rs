// Sign handlers. Signs are free-text map labels owned by the company that
// placed them. Renaming a sign to the empty string removes it.

use crate::command::CommandEnvelope;
use crate::cost::{CMD_ERROR, CommandCost};
use crate::flags::DoCommandFlags;
use crate::strings::*;
use crate::types::{ExpensesType, SignId};
use crate::world::{Sign, World};

/// `PlaceSign`: place a sign with `env.text` on `env.tile`.
pub fn cmd_place_sign(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    if !world.map.contains(env.tile) {
        return CMD_ERROR;
    }
    if world.signs.len() >= world.config.max_signs as usize {
        return CommandCost::error(ERROR_TOO_MANY_SIGNS);
    }
    let text = env.text_or_empty();
    if text.len() > world.config.max_text_len {
        return CommandCost::error(ERROR_TEXT_TOO_LONG);
    }

    if flags.contains(DoCommandFlags::EXEC) {
        let id = world.add_sign(Sign {
            tile: env.tile,
            text: text.to_owned(),
            owner: env.company,
        });
        log::debug!(target: "switchyard::sign", "sign {} placed at {}", id.0, env.tile);
    }
    CommandCost::with_cost(ExpensesType::Other, world.config.prices.place_sign)
}

/// `RenameSign`: change the text of sign `p1`, or remove it when the new
/// text is empty.
pub fn cmd_rename_sign(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    let id = SignId(env.p1);
    let Some(sign) = world.signs.get(&id) else {
        return CMD_ERROR;
    };
    if !sign.owner.is_spectator() && sign.owner != env.company {
        return CommandCost::error(ERROR_OWNED_BY_ANOTHER_COMPANY);
    }
    let text = env.text_or_empty();
    if text.len() > world.config.max_text_len {
        return CommandCost::error(ERROR_TEXT_TOO_LONG);
    }

    if flags.contains(DoCommandFlags::EXEC) {
        if text.is_empty() {
            world.signs.remove(&id);
        } else if let Some(sign) = world.signs.get_mut(&id) {
            sign.text = text.to_owned();
        }
    }
    CommandCost::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::config::GameConfig;
    use crate::types::{CompanyId, TileIndex};

    fn world() -> World {
        World::new(GameConfig {
            map_size_x: 16,
            map_size_y: 16,
            max_signs: 2,
            ..GameConfig::default()
        })
    }

    fn place(text: &str) -> CommandEnvelope {
        CommandEnvelope::new(Command::PlaceSign, TileIndex(20))
            .with_text(text)
            .with_company(CompanyId(0))
    }

    #[test]
    fn place_until_full() {
        let mut w = world();
        assert!(cmd_place_sign(&mut w, DoCommandFlags::EXEC, &place("a")).succeeded());
        assert!(cmd_place_sign(&mut w, DoCommandFlags::EXEC, &place("b")).succeeded());
        let res = cmd_place_sign(&mut w, DoCommandFlags::EXEC, &place("c"));
        assert_eq!(res.error_message(), Some(ERROR_TOO_MANY_SIGNS));
        assert_eq!(w.signs.len(), 2);
    }

    #[test]
    fn long_text_rejected() {
        let mut w = world();
        let text = "x".repeat(w.config.max_text_len + 1);
        let res = cmd_place_sign(&mut w, DoCommandFlags::EXEC, &place(&text));
        assert_eq!(res.error_message(), Some(ERROR_TEXT_TOO_LONG));
        assert!(w.signs.is_empty());
    }

    #[test]
    fn rename_and_remove() {
        let mut w = world();
        cmd_place_sign(&mut w, DoCommandFlags::EXEC, &place("depot"));
        let id = *w.signs.keys().next().unwrap();

        let rename = CommandEnvelope::new(Command::RenameSign, TileIndex::INVALID)
            .with_params(id.0, 0)
            .with_text("yard")
            .with_company(CompanyId(0));
        assert!(cmd_rename_sign(&mut w, DoCommandFlags::EXEC, &rename).succeeded());
        assert_eq!(w.signs[&id].text, "yard");

        let foreign = rename.clone().with_company(CompanyId(1));
        let res = cmd_rename_sign(&mut w, DoCommandFlags::EXEC, &foreign);
        assert_eq!(res.error_message(), Some(ERROR_OWNED_BY_ANOTHER_COMPANY));

        let remove = CommandEnvelope::new(Command::RenameSign, TileIndex::INVALID)
            .with_params(id.0, 0)
            .with_company(CompanyId(0));
        assert!(cmd_rename_sign(&mut w, DoCommandFlags::EXEC, &remove).succeeded());
        assert!(w.signs.is_empty());
    }
}
