// Company money handlers.
//
// `GiveMoney` moves money between companies: the issuer pays the amount as
// the command cost (debited by the executor after the exec run) and the
// handler credits the recipient. `MoneyCheat` is a negative cost, so the
// executor's normal debit turns it into income. The cheat is `OFFLINE`: it
// is refused inside a replicated session.

use crate::command::CommandEnvelope;
use crate::cost::{CMD_ERROR, CommandCost};
use crate::flags::DoCommandFlags;
use crate::strings::*;
use crate::types::{CompanyId, ExpensesType, Money};
use crate::world::World;

/// `GiveMoney`: transfer `p1` to company `p2`.
pub fn cmd_give_money(
    world: &mut World,
    flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    if !world.settings.give_money {
        return CommandCost::error(ERROR_GIVE_MONEY_DISABLED);
    }
    let amount = Money::from(env.p1);
    let Ok(target_raw) = u8::try_from(env.p2) else {
        return CMD_ERROR;
    };
    let target = CompanyId(target_raw);
    if amount == 0
        || env.company.is_spectator()
        || target == env.company
        || world.company(target).is_none()
    {
        return CMD_ERROR;
    }

    if flags.contains(DoCommandFlags::EXEC) {
        if let Some(c) = world.company_mut(target) {
            c.money = c.money.saturating_add(amount);
        }
    }
    CommandCost::with_cost(ExpensesType::Transfer, amount)
}

/// `MoneyCheat`: grant the issuer `p1` (read as signed) out of thin air.
pub fn cmd_money_cheat(
    world: &mut World,
    _flags: DoCommandFlags,
    env: &CommandEnvelope,
) -> CommandCost {
    if world.company(env.company).is_none() {
        return CMD_ERROR;
    }
    let amount = Money::from(env.p1 as i32);
    CommandCost::with_cost(ExpensesType::Other, -amount)
}
