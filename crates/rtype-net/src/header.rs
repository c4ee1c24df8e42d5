//! The 12-byte packet header plus the 4-byte CRC32 trailer every packet on
//! the wire carries (spec §4.6). All multi-byte fields are big-endian.
//!
//! Layout: `packetType(u8) | messageType(u8) | sequenceId(u16) | tickId(u32)
//! | payloadSize(u16) | reserved(u16)`, followed by `payloadSize` bytes of
//! payload, followed by a `crc32(header || payload)` trailer.

use crate::error::CodecError;
use crate::message::MessageType;

pub const HEADER_LEN: usize = 12;
pub const CRC_LEN: usize = 4;

/// Which side originated the packet. Carried as the header's first byte so
/// a receiver can reject a packet type it never expects on that socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    ClientToServer,
    ServerToClient,
}

impl PacketKind {
    fn to_byte(self) -> u8 {
        match self {
            PacketKind::ClientToServer => 0,
            PacketKind::ServerToClient => 1,
        }
    }

    fn from_byte(b: u8) -> Result<Self, CodecError> {
        match b {
            0 => Ok(PacketKind::ClientToServer),
            1 => Ok(PacketKind::ServerToClient),
            other => Err(CodecError::UnknownPacketKind { value: other }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_kind: PacketKind,
    pub message_type: MessageType,
    pub sequence_id: u16,
    pub tick_id: u32,
    pub payload_size: u16,
}

impl PacketHeader {
    pub fn new(packet_kind: PacketKind, message_type: MessageType, sequence_id: u16, tick_id: u32, payload_size: u16) -> Self {
        Self {
            packet_kind,
            message_type,
            sequence_id,
            tick_id,
            payload_size,
        }
    }

    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.packet_kind.to_byte();
        out[1] = self.message_type.to_byte();
        out[2..4].copy_from_slice(&self.sequence_id.to_be_bytes());
        out[4..8].copy_from_slice(&self.tick_id.to_be_bytes());
        out[8..10].copy_from_slice(&self.payload_size.to_be_bytes());
        out[10..12].copy_from_slice(&0u16.to_be_bytes()); // reserved
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::TooShort {
                need: HEADER_LEN,
                got: bytes.len(),
            });
        }
        let packet_kind = PacketKind::from_byte(bytes[0])?;
        let message_type = MessageType::from_byte(bytes[1])?;
        let sequence_id = u16::from_be_bytes([bytes[2], bytes[3]]);
        let tick_id = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let payload_size = u16::from_be_bytes([bytes[8], bytes[9]]);
        Ok(Self {
            packet_kind,
            message_type,
            sequence_id,
            tick_id,
            payload_size,
        })
    }
}

/// Frames `header` and `payload` into a wire-ready buffer, appending the
/// trailing CRC32 of `header || payload`.
pub fn encode_frame(header: &PacketHeader, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// Validates the CRC trailer and the declared payload size, returning the
/// header and a borrowed slice over the payload bytes.
pub fn decode_frame(bytes: &[u8]) -> Result<(PacketHeader, &[u8]), CodecError> {
    if bytes.len() < HEADER_LEN + CRC_LEN {
        return Err(CodecError::TooShort {
            need: HEADER_LEN + CRC_LEN,
            got: bytes.len(),
        });
    }
    let (body, trailer) = bytes.split_at(bytes.len() - CRC_LEN);
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(CodecError::CrcMismatch { expected, actual });
    }

    let header = PacketHeader::decode(body)?;
    let payload = &body[HEADER_LEN..];
    if payload.len() != header.payload_size as usize {
        return Err(CodecError::PayloadSizeMismatch {
            expected: header.payload_size,
            actual: payload.len(),
        });
    }
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_and_payload() {
        let header = PacketHeader::new(PacketKind::ClientToServer, MessageType::ClientPing, 7, 42, 3);
        let frame = encode_frame(&header, &[1, 2, 3]);
        let (decoded, payload) = decode_frame(&frame).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn corrupted_byte_fails_crc() {
        let header = PacketHeader::new(PacketKind::ServerToClient, MessageType::ServerPong, 1, 1, 0);
        let mut frame = encode_frame(&header, &[]);
        let last = frame.len() - 1;
        frame[0] ^= 0xFF;
        let _ = last;
        assert!(matches!(decode_frame(&frame), Err(CodecError::CrcMismatch { .. })));
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(matches!(decode_frame(&[0u8; 4]), Err(CodecError::TooShort { .. })));
    }

    #[test]
    fn payload_size_mismatch_is_rejected() {
        let header = PacketHeader::new(PacketKind::ClientToServer, MessageType::ClientPing, 1, 1, 5);
        let mut body = header.encode().to_vec();
        body.extend_from_slice(&[0, 0, 0]); // only 3 bytes, header claims 5
        let crc = crc32fast::hash(&body);
        body.extend_from_slice(&crc.to_be_bytes());
        assert!(matches!(decode_frame(&body), Err(CodecError::PayloadSizeMismatch { .. })));
    }
}
