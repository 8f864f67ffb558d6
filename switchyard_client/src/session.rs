// A running game from one peer's point of view.
//
// `GameSession` owns the world, the command dispatcher, the UI feed and, in
// a networked game, the relay link. It is the glue the presentation layer
// talks to:
//
// - `request()` / `estimate()` issue commands on behalf of this peer's
//   company.
// - `flush()` hands encoded requests to the relay.
// - `poll()` applies whatever the relay sent: `GameStart` builds the world
//   from the shared seed and config, each `Turn` replays its commands in
//   order through `apply_replicated()`, and a lost connection fails every
//   pending request so their callbacks still fire.
//
// Relay player ids map onto companies directly: player N plays company N
// while N is below the configured company count, later joiners spectate.
// The issuing company of a replicated command is always derived from the
// relay-tagged sender, never from the packet.
//
// **Critical constraint: determinism.** The world is only ever mutated
// through the dispatcher, and in a networked game only by replicated turns
// (plus `LOCAL` commands, which touch nothing the checksum covers).

use switchyard_protocol::message::{ServerMessage, TurnCommand};
use switchyard_protocol::types::{RelayPlayerId, TurnNumber};
use switchyard_relay::client::{HelloInfo, NetClient, NetError};
use switchyard_sim::callback::{CallbackError, CallbackId, CallbackRegistryBuilder};
use switchyard_sim::command::CommandEnvelope;
use switchyard_sim::config::GameConfig;
use switchyard_sim::cost::CommandCost;
use switchyard_sim::dispatch::{CommandDispatcher, ReplicatedOrigin};
use switchyard_sim::flags::DoCommandFlags;
use switchyard_sim::registry::command_table_hash;
use switchyard_sim::strings::ERROR_CONNECTION_LOST;
use switchyard_sim::types::CompanyId;
use switchyard_sim::world::World;
use thiserror::Error;

use crate::callbacks::{FeatureCallbacks, register_all};
use crate::ui::UiFeed;

const LOG_TARGET: &str = "switchyard::session";

/// Report a world checksum after every this many turns by default.
pub const DEFAULT_CHECKSUM_INTERVAL: u64 = 1;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("callback registration failed: {0}")]
    Callback(#[from] CallbackError),
    #[error("the game has not started yet")]
    NotStarted,
    #[error("only the host can do that")]
    NotHost,
}

struct RelayLink {
    client: NetClient,
    host_id: RelayPlayerId,
    lost: bool,
}

pub struct GameSession {
    config: GameConfig,
    world: Option<World>,
    dispatcher: CommandDispatcher,
    callbacks: FeatureCallbacks,
    ui: UiFeed,
    company: CompanyId,
    relay: Option<RelayLink>,
    checksum_interval: u64,
    last_turn: TurnNumber,
}

/// Company played by relay player `player`.
pub fn company_for(player: RelayPlayerId, config: &GameConfig) -> CompanyId {
    match u8::try_from(player.0) {
        Ok(n) if n < config.company_count => CompanyId(n),
        _ => CompanyId::SPECTATOR,
    }
}

fn build_dispatcher(
    ui: &UiFeed,
    networked_as_host: Option<bool>,
) -> Result<(CommandDispatcher, FeatureCallbacks), CallbackError> {
    let mut builder = CallbackRegistryBuilder::new();
    let callbacks = register_all(&mut builder, ui)?;
    let registry = builder.build();
    let dispatcher = match networked_as_host {
        None => CommandDispatcher::offline(registry),
        Some(is_host) => CommandDispatcher::networked(registry, is_host),
    };
    Ok((dispatcher, callbacks))
}

impl GameSession {
    /// A single-player game, started immediately.
    pub fn offline(seed: u64, config: GameConfig, ui: UiFeed) -> Result<Self, SessionError> {
        let (dispatcher, callbacks) = build_dispatcher(&ui, None)?;
        log::info!(target: LOG_TARGET, "offline game, seed {seed}");
        Ok(Self {
            world: Some(World::generate(seed, config.clone())),
            config,
            dispatcher,
            callbacks,
            ui,
            company: CompanyId(0),
            relay: None,
            checksum_interval: DEFAULT_CHECKSUM_INTERVAL,
            last_turn: TurnNumber(0),
        })
    }

    /// Join (or, as the first player, host) a relay session. The world is
    /// built when the host starts the game; see `poll()`.
    pub fn connect(
        addr: &str,
        player_name: &str,
        password: Option<String>,
        config: GameConfig,
        ui: UiFeed,
    ) -> Result<Self, SessionError> {
        let client = NetClient::connect(
            addr,
            HelloInfo {
                player_name: player_name.into(),
                sim_version_hash: command_table_hash(),
                config_hash: config.config_hash(),
                password,
            },
        )?;
        let welcome = client.welcome().clone();
        let (dispatcher, callbacks) = build_dispatcher(&ui, Some(welcome.is_host()))?;
        let company = company_for(welcome.player_id, &config);
        log::info!(target: LOG_TARGET, "{} plays {company}", welcome.player_id);
        Ok(Self {
            config,
            world: None,
            dispatcher,
            callbacks,
            ui,
            company,
            relay: Some(RelayLink {
                client,
                host_id: welcome.host_id,
                lost: false,
            }),
            checksum_interval: DEFAULT_CHECKSUM_INTERVAL,
            last_turn: TurnNumber(0),
        })
    }

    pub fn set_checksum_interval(&mut self, turns: u64) {
        self.checksum_interval = turns.max(1);
    }

    /// Host only: start the game for everyone with `seed` and this
    /// session's config.
    pub fn start_game(&mut self, seed: u64) -> Result<(), SessionError> {
        let Some(relay) = &mut self.relay else {
            return Ok(());
        };
        if !relay.client.is_host() {
            return Err(SessionError::NotHost);
        }
        relay.client.send_start_game(seed, self.config.to_json())?;
        Ok(())
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn company(&self) -> CompanyId {
        self.company
    }

    pub fn callbacks(&self) -> FeatureCallbacks {
        self.callbacks
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn is_networked(&self) -> bool {
        self.relay.is_some()
    }

    pub fn last_turn(&self) -> TurnNumber {
        self.last_turn
    }

    /// Issue a command as this peer's company. See
    /// `CommandDispatcher::request_command` for what the return value means.
    pub fn request(
        &mut self,
        envelope: CommandEnvelope,
        dc_flags: DoCommandFlags,
        callback: Option<CallbackId>,
    ) -> Result<bool, SessionError> {
        let world = self.world.as_mut().ok_or(SessionError::NotStarted)?;
        let envelope = envelope.with_company(self.company);
        let accepted = self
            .dispatcher
            .request_command(world, envelope, dc_flags, callback);
        self.report_completions();
        Ok(accepted)
    }

    /// Cost preview as this peer's company. Never transmitted.
    pub fn estimate(&mut self, envelope: CommandEnvelope) -> Result<CommandCost, SessionError> {
        let world = self.world.as_mut().ok_or(SessionError::NotStarted)?;
        let envelope = envelope.with_company(self.company);
        Ok(self.dispatcher.estimate_command(world, &envelope))
    }

    /// Send queued requests to the relay. Returns how many were sent. A send
    /// failure fails every pending request.
    pub fn flush(&mut self) -> Result<usize, SessionError> {
        let outbox = self.dispatcher.drain_outbox();
        let Some(relay) = &mut self.relay else {
            debug_assert!(outbox.is_empty(), "offline session produced packets");
            return Ok(0);
        };
        let count = outbox.len();
        for payload in outbox {
            if let Err(e) = relay.client.send_command(payload) {
                log::warn!(target: LOG_TARGET, "send failed: {e}");
                self.connection_lost();
                self.report_completions();
                return Err(e.into());
            }
        }
        Ok(count)
    }

    /// Apply everything the relay sent since the last poll. Returns the
    /// number of turns applied.
    pub fn poll(&mut self) -> usize {
        let Some(relay) = &self.relay else {
            return 0;
        };
        let messages = relay.client.poll();
        let disconnected = relay.client.is_disconnected();

        let mut turns = 0;
        for msg in messages {
            match msg {
                ServerMessage::GameStart { seed, config_json } => {
                    self.start_world(seed, &config_json)
                }
                ServerMessage::Turn {
                    turn_number,
                    commands,
                } => {
                    self.apply_turn(turn_number, commands);
                    turns += 1;
                }
                ServerMessage::DesyncDetected { turn } => {
                    log::error!(target: LOG_TARGET, "relay reports desync at turn {}", turn.0);
                    self.ui.notice(format!("Desync detected at turn {}", turn.0));
                }
                ServerMessage::PlayerJoined { player } => {
                    self.ui.notice(format!("{} joined", player.name));
                }
                ServerMessage::PlayerLeft { name, .. } => {
                    self.ui.notice(format!("{name} left"));
                }
                other @ (ServerMessage::Welcome { .. } | ServerMessage::Rejected { .. }) => {
                    log::warn!(target: LOG_TARGET, "unexpected message after handshake: {other:?}");
                }
            }
        }
        if disconnected {
            self.connection_lost();
        }
        self.report_completions();
        turns
    }

    /// Leave the session. Pending requests fail.
    pub fn disconnect(&mut self) {
        if let Some(relay) = &mut self.relay {
            relay.client.disconnect();
        }
        self.connection_lost();
        self.report_completions();
    }

    fn start_world(&mut self, seed: u64, config_json: &str) {
        if self.world.is_some() {
            log::warn!(target: LOG_TARGET, "ignoring second GameStart");
            return;
        }
        let config = match GameConfig::from_json(config_json) {
            Ok(config) => config,
            Err(e) => {
                log::error!(target: LOG_TARGET, "host sent an unusable config: {e}");
                self.ui.notice("The host's game settings could not be read");
                return;
            }
        };
        if config.config_hash() != self.config.config_hash() {
            log::warn!(target: LOG_TARGET, "host config differs from ours; using the host's");
        }
        log::info!(target: LOG_TARGET, "game starting, seed {seed}");
        self.world = Some(World::generate(seed, config.clone()));
        self.config = config;
    }

    fn apply_turn(&mut self, turn: TurnNumber, commands: Vec<TurnCommand>) {
        let (Some(world), Some(relay)) = (self.world.as_mut(), self.relay.as_mut()) else {
            log::error!(target: LOG_TARGET, "turn {} arrived before the game started", turn.0);
            return;
        };
        let me = relay.client.player_id();
        for command in commands {
            let origin = ReplicatedOrigin {
                company: company_for(command.player_id, &self.config),
                is_local: command.player_id == me,
                sender_is_host: command.player_id == relay.host_id,
            };
            if let Err(e) = self
                .dispatcher
                .apply_replicated(world, origin, &command.payload)
            {
                log::warn!(target: LOG_TARGET, "skipped command from {}: {e}", command.player_id);
            }
        }
        self.last_turn = turn;
        if turn.0 % self.checksum_interval == 0 {
            if let Err(e) = relay.client.send_checksum(turn, world.checksum()) {
                log::warn!(target: LOG_TARGET, "checksum for turn {} not sent: {e}", turn.0);
            }
        }
    }

    /// Fail everything pending. Safe to call repeatedly; the notice is shown
    /// once.
    fn connection_lost(&mut self) {
        let Some(relay) = &mut self.relay else {
            return;
        };
        if !relay.lost {
            relay.lost = true;
            log::warn!(target: LOG_TARGET, "relay connection lost");
            self.ui.notice("Connection to the server lost");
        }
        self.dispatcher.fail_pending(ERROR_CONNECTION_LOST);
    }

    fn report_completions(&mut self) {
        for completion in self.dispatcher.drain_completions() {
            self.ui.report_completion(&completion);
        }
    }
}
