// Client-facing command dispatch.
//
// `CommandDispatcher::request_command()` is the one entry point the UI and
// scripts use to issue commands. What happens next depends on the mode:
//
// - Offline: the command runs through the executor immediately, the
//   completion callback fires synchronously, and the return value is the
//   command's success.
// - Networked: a local test run (including the funds check) guards the
//   request. If it passes, the command is assigned a `RequestId`, encoded
//   into the outbox for the transport, and parked in the pending table; the
//   return value only means "accepted for transmission". The real outcome
//   arrives when the relay orders the command into a turn and every peer
//   applies it through `apply_replicated()`. The originating peer then
//   resolves the pending entry and fires the callback.
//
// `LOCAL` commands never reach the wire, even in a networked session: they
// behave exactly as offline. `SERVER` commands from a non-host peer fail
// immediately on the sender and are refused by every receiver as well.
// Requests with `QUERY_COST` are cost previews: estimate-only, never
// transmitted, no callback. `NO_EST` commands ignore `QUERY_COST`.
//
// The local test run must see exactly what receivers will execute: command
// text is sanitized before it, requests whose text would not survive
// `CommandPacket::decode` are refused up front, and the caller's
// handler-visible flags travel in the packet.
//
// Every accepted request produces exactly one callback invocation: from the
// synchronous path, from `apply_replicated()`, or from `fail_pending()` when
// the transport dies. Every finished request issued by this peer is also
// recorded as a `Completion` so the UI layer can show error popups and cost
// estimates without owning a callback.
//
// See also: `executor.rs` for the check pipeline, `replication.rs` for the
// wire record, `callback.rs` for the callback table.

use crate::callback::{CallbackId, CallbackRegistry};
use crate::command::{CommandEnvelope, CommandSource};
use crate::cost::{CMD_ERROR, CommandCost};
use crate::executor::Executor;
use crate::flags::{CommandFlags, DoCommandFlags};
use crate::registry::command_info;
use crate::replication::{
    CommandPacket, PacketError, RequestId, sanitize_text, validate_outgoing,
};
use crate::strings::{ERROR_ONLY_AVAILABLE_TO_HOST, ERROR_TEXT_TOO_LONG, StringId};
use crate::types::CompanyId;
use crate::world::World;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "switchyard::dispatch";

/// Whether this peer is alone or part of a relay session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    Offline,
    Networked { is_host: bool },
}

/// A finished request issued by this peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub envelope: CommandEnvelope,
    pub result: CommandCost,
    pub flags: DoCommandFlags,
    /// The request was a cost preview, not an attempt.
    pub estimate: bool,
}

/// Where a replicated command came from, as established by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicatedOrigin {
    /// Company bound to the sending peer.
    pub company: CompanyId,
    /// The sender is this peer.
    pub is_local: bool,
    /// The sender is the session host.
    pub sender_is_host: bool,
}

#[derive(Debug)]
struct PendingCommand {
    callback: Option<CallbackId>,
    envelope: CommandEnvelope,
    flags: DoCommandFlags,
}

/// Routes command requests to the executor or the network.
#[derive(Debug)]
pub struct CommandDispatcher {
    mode: DispatchMode,
    executor: Executor,
    callbacks: CallbackRegistry,
    next_request_id: u32,
    pending: BTreeMap<RequestId, PendingCommand>,
    outbox: Vec<Vec<u8>>,
    completions: Vec<Completion>,
}

impl CommandDispatcher {
    pub fn new(mode: DispatchMode, callbacks: CallbackRegistry) -> Self {
        Self {
            mode,
            executor: Executor::new(matches!(mode, DispatchMode::Networked { .. })),
            callbacks,
            next_request_id: 0,
            pending: BTreeMap::new(),
            outbox: Vec::new(),
            completions: Vec::new(),
        }
    }

    pub fn offline(callbacks: CallbackRegistry) -> Self {
        Self::new(DispatchMode::Offline, callbacks)
    }

    pub fn networked(callbacks: CallbackRegistry, is_host: bool) -> Self {
        Self::new(DispatchMode::Networked { is_host }, callbacks)
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Requests transmitted but not yet replicated back.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Issue a command. Returns whether it succeeded (offline and `LOCAL`)
    /// or was accepted for transmission (networked).
    pub fn request_command(
        &mut self,
        world: &mut World,
        mut envelope: CommandEnvelope,
        dc_flags: DoCommandFlags,
        callback: Option<CallbackId>,
    ) -> bool {
        let Some(info) = command_info(envelope.cmd.opcode()) else {
            self.finish(callback, envelope, CMD_ERROR, dc_flags, false);
            return false;
        };
        if let Some(text) = &mut envelope.text {
            *text = sanitize_text(text, info.flags);
        }

        if dc_flags.contains(DoCommandFlags::QUERY_COST)
            && !info.flags.contains(CommandFlags::NO_EST)
        {
            let result = self.executor.execute(world, &envelope, dc_flags, true);
            self.finish(None, envelope, result, dc_flags, true);
            return result.succeeded();
        }
        let dc_flags = dc_flags - DoCommandFlags::QUERY_COST;

        let is_host = match self.mode {
            DispatchMode::Offline => {
                return self.execute_locally(world, envelope, dc_flags, callback);
            }
            DispatchMode::Networked { is_host } => is_host,
        };
        if info.flags.contains(CommandFlags::LOCAL) {
            return self.execute_locally(world, envelope, dc_flags, callback);
        }
        if info.flags.contains(CommandFlags::SERVER) && !is_host {
            let result = CommandCost::error(ERROR_ONLY_AVAILABLE_TO_HOST);
            self.finish(callback, envelope, result, dc_flags, false);
            return false;
        }

        if let Err(e) = validate_outgoing(&envelope) {
            log::debug!(target: LOG_TARGET, "{} refused before sending: {e}", envelope.cmd);
            let result = CommandCost::error(ERROR_TEXT_TOO_LONG);
            self.finish(callback, envelope, result, dc_flags, false);
            return false;
        }

        let test = self.executor.test_command(world, &envelope, dc_flags);
        if test.failed() {
            self.finish(callback, envelope, test, dc_flags, false);
            return false;
        }

        let request_id = RequestId(self.next_request_id);
        let packet = CommandPacket::from_envelope(request_id, &envelope).with_flags(dc_flags);
        let bytes = match packet.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!(target: LOG_TARGET, "failed to encode {}: {e}", envelope.cmd);
                self.finish(callback, envelope, CMD_ERROR, dc_flags, false);
                return false;
            }
        };
        self.next_request_id = self.next_request_id.wrapping_add(1);
        log::debug!(target: LOG_TARGET, "queued {} as request {}", envelope.cmd, request_id.0);
        self.outbox.push(bytes);
        self.pending.insert(
            request_id,
            PendingCommand {
                callback,
                envelope,
                flags: dc_flags,
            },
        );
        true
    }

    /// Pure cost preview: estimate-only execution that is never transmitted,
    /// never fires a callback and ignores `NO_EST`.
    pub fn estimate_command(
        &mut self,
        world: &mut World,
        envelope: &CommandEnvelope,
    ) -> CommandCost {
        self.executor
            .execute(world, envelope, DoCommandFlags::QUERY_COST, true)
    }

    /// Encoded packets waiting for the transport.
    pub fn drain_outbox(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outbox)
    }

    /// Requests finished since the last drain, in completion order.
    pub fn drain_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    /// Execute a command delivered by the relay. Every peer calls this for
    /// every command of every turn, in turn order. When the command
    /// originated here, its pending request is resolved.
    pub fn apply_replicated(
        &mut self,
        world: &mut World,
        origin: ReplicatedOrigin,
        payload: &[u8],
    ) -> Result<CommandCost, PacketError> {
        let packet = CommandPacket::decode(payload).inspect_err(|e| {
            log::warn!(
                target: LOG_TARGET,
                "dropping malformed command from {}: {e}",
                origin.company
            );
        })?;
        let mut envelope = packet.to_envelope()?;
        envelope.company = origin.company;
        if !origin.is_local {
            envelope.source = CommandSource::Network;
        }

        let flags = command_info(envelope.cmd.opcode()).map_or(CommandFlags::empty(), |i| i.flags);
        let result = if flags.contains(CommandFlags::SERVER) && !origin.sender_is_host {
            log::warn!(
                target: LOG_TARGET,
                "{} from non-host {} refused",
                envelope.cmd,
                origin.company
            );
            CommandCost::error(ERROR_ONLY_AVAILABLE_TO_HOST)
        } else if flags.contains(CommandFlags::LOCAL) {
            log::warn!(target: LOG_TARGET, "local-only {} arrived over the network", envelope.cmd);
            CMD_ERROR
        } else {
            self.executor
                .execute(world, &envelope, packet.dc_flags(), false)
        };

        if origin.is_local {
            match self.pending.remove(&packet.request_id) {
                Some(p) => self.finish(p.callback, p.envelope, result, p.flags, false),
                None => log::warn!(
                    target: LOG_TARGET,
                    "replicated request {} has no pending entry",
                    packet.request_id.0
                ),
            }
        }
        Ok(result)
    }

    /// Fail every pending request with `reason`, e.g. when the connection to
    /// the relay is lost. Each pending callback fires exactly once.
    pub fn fail_pending(&mut self, reason: StringId) {
        if !self.pending.is_empty() {
            log::warn!(target: LOG_TARGET, "failing {} pending requests", self.pending.len());
        }
        for (_, p) in std::mem::take(&mut self.pending) {
            self.finish(p.callback, p.envelope, CommandCost::error(reason), p.flags, false);
        }
    }

    fn execute_locally(
        &mut self,
        world: &mut World,
        envelope: CommandEnvelope,
        dc_flags: DoCommandFlags,
        callback: Option<CallbackId>,
    ) -> bool {
        let result = self.executor.execute(world, &envelope, dc_flags, false);
        self.finish(callback, envelope, result, dc_flags, false);
        result.succeeded()
    }

    fn finish(
        &mut self,
        callback: Option<CallbackId>,
        envelope: CommandEnvelope,
        result: CommandCost,
        flags: DoCommandFlags,
        estimate: bool,
    ) {
        if let Some(id) = callback {
            self.callbacks.invoke(id, &result, &envelope);
        }
        self.completions.push(Completion {
            envelope,
            result,
            flags,
            estimate,
        });
    }
}
