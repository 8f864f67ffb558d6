// The local executor: the single path through which commands mutate state.
//
// `Executor::execute()` runs one command against the world and returns its
// `CommandCost`. Checks run in a fixed order and stop at the first failure:
//
//   1. opcode lookup in the registry (programming error if missing);
//   2. `OFFLINE` commands are refused inside a replicated session;
//   3. the issuer must be an existing company unless the command is
//      `SPECTATOR`;
//   4. pause check: while paused, only `PAUSE_OK` commands and commands whose
//      category the `command_pause_level` setting allows may run.
//      `FREE_WHILE_PAUSED` commands are let through to the test run and
//      rejected there if they would cost money;
//   5. dispatch flags = static flags mapped by `command_flags_to_dc_flags`,
//      merged with the caller's flags. The executor owns `EXEC`;
//   6. test run: the handler without `EXEC`. Handlers never mutate here;
//   7. estimate-only requests return the test result, funds untouched;
//   8. funds check on the test cost;
//   9. exec run: the handler with `EXEC`;
//  10. the world books the exec cost against the issuing company.
//
// Cost is therefore always known before anything is committed. Handlers only
// mutate in the exec run, and the exec run only happens after the funds check
// passed on the same input, so no rollback is ever needed. For `NO_TEST`
// commands the exec run may legitimately report a different cost than the
// test run; for every other command a mismatch is a determinism bug and is
// logged as an error.
//
// See also: `registry.rs` for the table driving these checks, `dispatch.rs`
// for the caller-facing entry point that decides between executing here and
// transmitting, `world.rs` for `apply_cost()`.

use crate::command::CommandEnvelope;
use crate::cost::{CMD_ERROR, CommandCost};
use crate::flags::{CommandFlags, DoCommandFlags, command_flags_to_dc_flags};
use crate::registry::{CommandInfo, command_info, is_allowed_at_pause_level};
use crate::strings::{ERROR_NOT_ALLOWED_WHILE_PAUSED, ERROR_NOT_ENOUGH_CASH_REQUIRES_X};
use crate::types::{CompanyId, Money};
use crate::world::World;

const LOG_TARGET: &str = "switchyard::command";

/// How far `run()` goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunMode {
    /// Test run only; funds are not consulted.
    Estimate,
    /// Test run plus funds check, no exec run.
    Test,
    /// The full pipeline.
    Exec,
}

/// Money the company has available to spend on a command. Issuers without a
/// company (spectators, town actions) have unlimited funds.
pub fn get_available_money_for_command(world: &World, company: CompanyId) -> Money {
    world.company(company).map_or(Money::MAX, |c| c.money)
}

/// Run a command handler directly, for handlers that issue sub-commands.
///
/// No pause, company or funds checks happen here: the enclosing command has
/// already passed them. The caller's flags are handed through unchanged,
/// including `EXEC`.
pub fn do_command(world: &mut World, env: &CommandEnvelope, flags: DoCommandFlags) -> CommandCost {
    match lookup(env) {
        Some(info) => (info.handler)(world, flags, env),
        None => CMD_ERROR,
    }
}

/// Registry entry for the envelope's opcode. A miss is a programming error:
/// fatal in debug builds, logged and refused in release builds.
fn lookup(env: &CommandEnvelope) -> Option<&'static CommandInfo> {
    let op = env.cmd.opcode();
    let info = command_info(op);
    debug_assert!(info.is_some(), "unregistered opcode {op}");
    if info.is_none() {
        log::error!(target: LOG_TARGET, "command with unregistered opcode {op}");
    }
    info
}

/// Executes commands against a `World`.
///
/// Holds the per-peer context the checks need: whether this peer is part of
/// a replicated session, and the shortfall of the last command refused for
/// lack of funds (shown by the UI as "requires X").
#[derive(Clone, Debug, Default)]
pub struct Executor {
    networked: bool,
    additional_cash_required: Money,
}

impl Executor {
    pub fn new(networked: bool) -> Self {
        Self {
            networked,
            additional_cash_required: 0,
        }
    }

    pub fn is_networked(&self) -> bool {
        self.networked
    }

    /// How much money the last command refused with "not enough cash" was
    /// missing. Zero if the last command was not refused for funds.
    pub fn additional_cash_required(&self) -> Money {
        self.additional_cash_required
    }

    /// Execute `env` for real, or with `estimate_only` compute its cost
    /// without mutating the world and without checking funds.
    pub fn execute(
        &mut self,
        world: &mut World,
        env: &CommandEnvelope,
        dc_flags: DoCommandFlags,
        estimate_only: bool,
    ) -> CommandCost {
        let mode = if estimate_only {
            RunMode::Estimate
        } else {
            RunMode::Exec
        };
        self.run(world, env, dc_flags, mode)
    }

    /// Validate and cost `env` including the funds check, without
    /// executing it. Used to guard requests before they are transmitted.
    pub fn test_command(
        &mut self,
        world: &mut World,
        env: &CommandEnvelope,
        dc_flags: DoCommandFlags,
    ) -> CommandCost {
        self.run(world, env, dc_flags, RunMode::Test)
    }

    fn run(
        &mut self,
        world: &mut World,
        env: &CommandEnvelope,
        dc_flags: DoCommandFlags,
        mode: RunMode,
    ) -> CommandCost {
        self.additional_cash_required = 0;

        let Some(info) = lookup(env) else {
            return CMD_ERROR;
        };
        if info.flags.contains(CommandFlags::OFFLINE) && self.networked {
            log::warn!(
                target: LOG_TARGET,
                "{} refused: offline-only command in a network game",
                info.name
            );
            return CMD_ERROR;
        }
        if !info.flags.contains(CommandFlags::SPECTATOR) && world.company(env.company).is_none() {
            log::debug!(
                target: LOG_TARGET,
                "{} refused: {} is not a company",
                info.name,
                env.company
            );
            return CMD_ERROR;
        }

        let free_only = match pause_verdict(world, info) {
            PauseVerdict::Allowed => false,
            PauseVerdict::IfFree => true,
            PauseVerdict::Refused => {
                return CommandCost::error(ERROR_NOT_ALLOWED_WHILE_PAUSED);
            }
        };

        let flags = command_flags_to_dc_flags(info.flags) | (dc_flags - DoCommandFlags::EXEC);

        let test = (info.handler)(world, flags, env);
        if test.failed() {
            log::debug!(
                target: LOG_TARGET,
                "{} at {} failed test run: {:?}",
                info.name,
                env.tile,
                test.error_message()
            );
            return test;
        }
        if free_only && test.cost() != 0 {
            return CommandCost::error(ERROR_NOT_ALLOWED_WHILE_PAUSED);
        }
        if mode == RunMode::Estimate {
            return test;
        }

        let available = get_available_money_for_command(world, env.company);
        if test.cost() > 0 && test.cost() > available {
            self.additional_cash_required = test.cost() - available;
            log::debug!(
                target: LOG_TARGET,
                "{} refused: costs {} but {} has {available}",
                info.name,
                test.cost(),
                env.company
            );
            return CommandCost::error(ERROR_NOT_ENOUGH_CASH_REQUIRES_X);
        }
        if mode == RunMode::Test {
            return test;
        }

        let exec = (info.handler)(world, flags | DoCommandFlags::EXEC, env);
        if !info.flags.contains(CommandFlags::NO_TEST)
            && (exec.succeeded() != test.succeeded() || exec.cost() != test.cost())
        {
            log::error!(
                target: LOG_TARGET,
                "{} at {}: test run and exec run disagree ({:?} vs {:?})",
                info.name,
                env.tile,
                test,
                exec
            );
        }
        if exec.succeeded() {
            world.apply_cost(env.company, &exec);
            log::debug!(
                target: LOG_TARGET,
                "{} at {} by {} cost {}",
                info.name,
                env.tile,
                env.company,
                exec.cost()
            );
        }
        exec
    }
}

enum PauseVerdict {
    Allowed,
    IfFree,
    Refused,
}

fn pause_verdict(world: &World, info: &CommandInfo) -> PauseVerdict {
    if !world.pause_mode.is_paused()
        || info.flags.contains(CommandFlags::PAUSE_OK)
        || is_allowed_at_pause_level(info.cmd.opcode(), world.settings.command_pause_level)
    {
        PauseVerdict::Allowed
    } else if info.flags.contains(CommandFlags::FREE_WHILE_PAUSED) {
        PauseVerdict::IfFree
    } else {
        PauseVerdict::Refused
    }
}
