// switchyard_sim — command dispatch core for a tile-based transport game.
//
// This crate contains everything that turns a command request into a
// validated, costed, replayable state transition: the command registry, the
// cost value, the executor, the client-facing dispatcher, the wire record
// for replication, and the completion callback registry. A small set of
// reference command handlers (roads, landscape, towns, signs, money, game
// settings) operates on a minimal tile world so the pipeline has something
// real to run. No networking lives here; see `switchyard_relay` for the
// transport and `switchyard_client` for the session glue.
//
// Module overview:
// - `types.rs`:       TileIndex, CompanyId, Money, PauseMode, ID newtypes.
// - `strings.rs`:     StringId failure reasons and their display text.
// - `cost.rs`:        CommandCost, CMD_ERROR and short-circuit accumulation.
// - `flags.rs`:       CommandFlags, DoCommandFlags, pause-level categories.
// - `command.rs`:     Command opcodes, CommandSource, CommandEnvelope.
// - `registry.rs`:    Static COMMAND_TABLE and the side-effect-free queries.
// - `executor.rs`:    The ordered check pipeline (test run, funds, exec run).
// - `dispatch.rs`:    CommandDispatcher: offline vs. networked routing,
//                     pending requests, completions.
// - `replication.rs`: CommandPacket wire record (bincode) and validation.
// - `callback.rs`:    Named completion callbacks, frozen at startup.
// - `world.rs`:       Replicated game state and its checksum.
// - `config.rs`:      GameConfig, prices and runtime settings.
// - `landscape.rs`, `road.rs`, `town.rs`, `sign.rs`, `company.rs`,
//   `game.rs`:        Reference command handlers.
//
// **Critical constraint: determinism.** Every peer applies the same commands
// in the same order to the same world and must end up with the same
// checksum. No `HashMap` iteration, no system time, no OS entropy; map
// generation draws from a seeded ChaCha8 PRNG. Use `BTreeMap` for ordered
// collections.

pub mod callback;
pub mod command;
pub mod company;
pub mod config;
pub mod cost;
pub mod dispatch;
pub mod executor;
pub mod flags;
pub mod game;
pub mod landscape;
pub mod registry;
pub mod replication;
pub mod road;
pub mod sign;
pub mod strings;
pub mod town;
pub mod types;
pub mod world;
