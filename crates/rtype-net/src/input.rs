//! The client→server input packet: `playerId(u32) | flags(u16) | x(f32) |
//! y(f32) | angle(f32)`, spec §4.6. `sequenceId`/`tickId` ride in the shared
//! header rather than the payload.

use rtype_sim::systems::input::InputFlags;

use crate::error::CodecError;
use crate::header::{decode_frame, encode_frame, PacketHeader, PacketKind};
use crate::message::MessageType;

pub const INPUT_PAYLOAD_LEN: usize = 4 + 2 + 4 + 4 + 4;

/// A fully decoded, validated input packet ready to become an
/// `rtype_sim::systems::input::InputEvent` once the server resolves
/// `player_id` to a live `EntityId`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputPacket {
    pub player_id: u32,
    pub sequence_id: u16,
    pub tick_id: u32,
    pub flags: InputFlags,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

pub fn encode_input_packet(pkt: &InputPacket) -> Vec<u8> {
    let mut payload = Vec::with_capacity(INPUT_PAYLOAD_LEN);
    payload.extend_from_slice(&pkt.player_id.to_be_bytes());
    payload.extend_from_slice(&pkt.flags.0.to_be_bytes());
    payload.extend_from_slice(&pkt.x.to_be_bytes());
    payload.extend_from_slice(&pkt.y.to_be_bytes());
    payload.extend_from_slice(&pkt.angle.to_be_bytes());

    let header = PacketHeader::new(
        PacketKind::ClientToServer,
        MessageType::ClientInput,
        pkt.sequence_id,
        pkt.tick_id,
        payload.len() as u16,
    );
    encode_frame(&header, &payload)
}

/// Decodes and validates a framed input packet: rejects unknown flag bits
/// and non-finite floats before the caller ever sees an `InputPacket`.
pub fn decode_input_packet(bytes: &[u8]) -> Result<InputPacket, CodecError> {
    let (header, payload) = decode_frame(bytes)?;
    if header.message_type != MessageType::ClientInput {
        return Err(CodecError::UnknownMessageType {
            value: header.message_type.to_byte(),
        });
    }
    if payload.len() != INPUT_PAYLOAD_LEN {
        return Err(CodecError::PayloadSizeMismatch {
            expected: INPUT_PAYLOAD_LEN as u16,
            actual: payload.len(),
        });
    }

    let player_id = u32::from_be_bytes(payload[0..4].try_into().unwrap());
    let flags_bits = u16::from_be_bytes(payload[4..6].try_into().unwrap());
    let flags = InputFlags(flags_bits);
    if !flags.is_known() {
        return Err(CodecError::UnknownFlagBits { bits: flags_bits });
    }
    let x = f32::from_be_bytes(payload[6..10].try_into().unwrap());
    let y = f32::from_be_bytes(payload[10..14].try_into().unwrap());
    let angle = f32::from_be_bytes(payload[14..18].try_into().unwrap());
    if !x.is_finite() || !y.is_finite() || !angle.is_finite() {
        return Err(CodecError::NonFiniteField);
    }

    Ok(InputPacket {
        player_id,
        sequence_id: header.sequence_id,
        tick_id: header.tick_id,
        flags,
        x,
        y,
        angle,
    })
}
