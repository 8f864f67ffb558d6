// Wire record for replicated commands.
//
// A `CommandPacket` is a `CommandEnvelope` plus the request id used to match
// the replicated command back to its pending callback on the originating
// peer. Packets are encoded with `bincode` (fixed-width little-endian
// integers, length-prefixed text), and travel as opaque payloads inside the
// relay protocol's `Command` / `TurnCommand` messages.
//
// Decoding is the trust boundary: every packet coming off the network is
// checked for a registered opcode and a bounded text payload, and control
// characters are stripped from the text unless the command is `STR_CTRL`.
// `CommandPacket` and `CommandEnvelope` convert into each other without loss.
// The caller's handler-visible `DoCommandFlags` ride along so receivers run
// the command with the same restrictions the sender tested it under.
//
// The `company` field carries the issuer as seen by the sender. Receivers do
// not trust it; the dispatcher re-derives the issuing company from the
// relay-tagged sender (see `dispatch.rs`).

use crate::command::{Command, CommandEnvelope, CommandSource, Opcode};
use crate::flags::{CommandFlags, DoCommandFlags};
use crate::registry::get_command_flags;
use crate::types::{CompanyId, TileIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest text payload accepted off the wire, in bytes.
pub const MAX_COMMAND_TEXT_LEN: usize = 255;

/// Upper bound on an encoded packet. The fixed part is well under 64 bytes.
pub const MAX_PACKET_LEN: usize = MAX_COMMAND_TEXT_LEN + 64;

/// Identifies one transmitted request on its originating peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u32);

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("packet codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("packet of {0} bytes exceeds the size limit")]
    TooLarge(usize),
    #[error("unknown command opcode {0}")]
    UnknownOpcode(Opcode),
    #[error("text payload of {0} bytes exceeds the limit")]
    TextTooLong(usize),
}

/// The replicated form of one command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPacket {
    pub request_id: RequestId,
    pub company: CompanyId,
    pub cmd: Opcode,
    pub tile: TileIndex,
    pub p1: u32,
    pub p2: u32,
    pub text: Option<String>,
    pub source: CommandSource,
    /// Bits of `DoCommandFlags::REPLICATED` the caller passed.
    pub flags: u16,
}

impl CommandPacket {
    pub fn from_envelope(request_id: RequestId, env: &CommandEnvelope) -> Self {
        Self {
            request_id,
            company: env.company,
            cmd: env.cmd.opcode(),
            tile: env.tile,
            p1: env.p1,
            p2: env.p2,
            text: env.text.clone(),
            source: env.source,
            flags: 0,
        }
    }

    /// Carry the caller's handler-visible flags. Anything outside
    /// `DoCommandFlags::REPLICATED` is dropped.
    pub fn with_flags(mut self, flags: DoCommandFlags) -> Self {
        self.flags = (flags & DoCommandFlags::REPLICATED).bits();
        self
    }

    /// The caller flags to execute with. Unknown bits from the wire are
    /// ignored.
    pub fn dc_flags(&self) -> DoCommandFlags {
        DoCommandFlags::from_bits_truncate(self.flags) & DoCommandFlags::REPLICATED
    }

    /// Rebuild the envelope. Fails only for opcodes outside the registry.
    pub fn to_envelope(&self) -> Result<CommandEnvelope, PacketError> {
        let cmd = Command::from_opcode(self.cmd).ok_or(PacketError::UnknownOpcode(self.cmd))?;
        Ok(CommandEnvelope {
            tile: self.tile,
            p1: self.p1,
            p2: self.p2,
            cmd,
            text: self.text.clone(),
            source: self.source,
            company: self.company,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode and validate a packet received from the network.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() > MAX_PACKET_LEN {
            return Err(PacketError::TooLarge(bytes.len()));
        }
        let mut packet: CommandPacket = bincode::deserialize(bytes)?;
        let Some(cmd) = Command::from_opcode(packet.cmd) else {
            return Err(PacketError::UnknownOpcode(packet.cmd));
        };
        if let Some(text) = &mut packet.text {
            if text.len() > MAX_COMMAND_TEXT_LEN {
                return Err(PacketError::TextTooLong(text.len()));
            }
            *text = sanitize_text(text, get_command_flags(cmd.opcode()));
        }
        Ok(packet)
    }
}

/// Check an outgoing envelope against the limits `decode` enforces, so a
/// request is never accepted that receivers would drop.
pub fn validate_outgoing(env: &CommandEnvelope) -> Result<(), PacketError> {
    let len = env.text.as_ref().map_or(0, String::len);
    if len > MAX_COMMAND_TEXT_LEN {
        return Err(PacketError::TextTooLong(len));
    }
    Ok(())
}

/// Strip control characters from command text unless the command allows
/// them with `STR_CTRL`.
pub fn sanitize_text(text: &str, flags: CommandFlags) -> String {
    if flags.contains(CommandFlags::STR_CTRL) {
        text.to_owned()
    } else {
        text.chars().filter(|c| !c.is_control()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::COMMAND_COUNT;
    use proptest::prelude::*;

    fn sample() -> CommandEnvelope {
        CommandEnvelope::new(Command::PlaceSign, TileIndex(42))
            .with_params(7, 9)
            .with_text("goods yard")
            .with_source(CommandSource::Other)
            .with_company(CompanyId(1))
    }

    #[test]
    fn integers_are_fixed_width_little_endian() {
        let packet = CommandPacket::from_envelope(RequestId(0x0102_0304), &sample());
        let bytes = packet.encode().unwrap();
        assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn unknown_opcode_rejected() {
        let mut packet = CommandPacket::from_envelope(RequestId(1), &sample());
        packet.cmd = COMMAND_COUNT as Opcode;
        let bytes = packet.encode().unwrap();
        assert!(matches!(
            CommandPacket::decode(&bytes),
            Err(PacketError::UnknownOpcode(_))
        ));
        assert!(packet.to_envelope().is_err());
    }

    #[test]
    fn long_text_rejected() {
        let env = sample().with_text("x".repeat(MAX_COMMAND_TEXT_LEN + 1));
        let bytes = CommandPacket::from_envelope(RequestId(1), &env).encode().unwrap();
        assert!(matches!(
            CommandPacket::decode(&bytes),
            Err(PacketError::TextTooLong(_))
        ));
    }

    #[test]
    fn truncated_packet_is_a_codec_error() {
        let bytes = CommandPacket::from_envelope(RequestId(1), &sample()).encode().unwrap();
        assert!(matches!(
            CommandPacket::decode(&bytes[..bytes.len() - 3]),
            Err(PacketError::Codec(_))
        ));
    }

    #[test]
    fn control_characters_stripped() {
        let env = sample().with_text("ya\u{7}rd\n");
        let bytes = CommandPacket::from_envelope(RequestId(1), &env).encode().unwrap();
        let decoded = CommandPacket::decode(&bytes).unwrap();
        assert_eq!(decoded.text.as_deref(), Some("yard"));
        assert_eq!(sanitize_text("a\tb", CommandFlags::STR_CTRL), "a\tb");
    }

    #[test]
    fn caller_flags_travel_with_the_packet() {
        let flags = DoCommandFlags::FORCE | DoCommandFlags::EXEC | DoCommandFlags::NO_ERROR_POPUP;
        let packet = CommandPacket::from_envelope(RequestId(1), &sample()).with_flags(flags);
        let decoded = CommandPacket::decode(&packet.encode().unwrap()).unwrap();
        assert_eq!(decoded.dc_flags(), DoCommandFlags::FORCE);

        let mut forged = packet;
        forged.flags = u16::MAX;
        assert_eq!(forged.dc_flags(), DoCommandFlags::REPLICATED);
    }

    #[test]
    fn outgoing_text_limit_matches_decode() {
        let at_limit = sample().with_text("x".repeat(MAX_COMMAND_TEXT_LEN));
        assert!(validate_outgoing(&at_limit).is_ok());
        let bytes = CommandPacket::from_envelope(RequestId(u32::MAX), &at_limit)
            .with_flags(DoCommandFlags::REPLICATED)
            .encode()
            .unwrap();
        assert!(CommandPacket::decode(&bytes).is_ok());

        let over = sample().with_text("x".repeat(MAX_COMMAND_TEXT_LEN + 1));
        assert!(matches!(validate_outgoing(&over), Err(PacketError::TextTooLong(_))));
    }

    fn arb_envelope() -> impl Strategy<Value = CommandEnvelope> {
        (
            0..COMMAND_COUNT as u32,
            any::<u32>(),
            any::<u32>(),
            any::<u32>(),
            proptest::option::of("[a-zA-Z0-9 ]{0,40}"),
            0u8..4,
        )
            .prop_map(|(op, tile, p1, p2, text, company)| CommandEnvelope {
                tile: TileIndex(tile),
                p1,
                p2,
                cmd: Command::from_opcode(op).unwrap(),
                text,
                source: CommandSource::Network,
                company: CompanyId(company),
            })
    }

    proptest! {
        #[test]
        fn envelope_survives_the_wire(env in arb_envelope(), id in any::<u32>()) {
            let bytes = CommandPacket::from_envelope(RequestId(id), &env).encode().unwrap();
            let packet = CommandPacket::decode(&bytes).unwrap();
            prop_assert_eq!(packet.request_id, RequestId(id));
            prop_assert_eq!(packet.to_envelope().unwrap(), env);
        }
    }
}
