//! Control-channel messages: join/ready/countdown/level-init/checksum and
//! their server-side acknowledgements (spec §4.6, §4.7, §6). Everything
//! that is not an input or snapshot packet lives here.
//!
//! Strings are length-prefixed: a `u8` byte count followed by that many
//! UTF-8 bytes, per the external-interface contract in spec §6.

use crate::error::CodecError;
use crate::header::{decode_frame, encode_frame, PacketHeader, PacketKind};
use crate::message::MessageType;

fn write_string(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u8::MAX as usize) as u8;
    out.push(len);
    out.extend_from_slice(&bytes[..len as usize]);
}

fn read_string(payload: &[u8], cursor: &mut usize) -> Result<String, CodecError> {
    if *cursor >= payload.len() {
        return Err(CodecError::TooShort { need: *cursor + 1, got: payload.len() });
    }
    let len = payload[*cursor] as usize;
    *cursor += 1;
    if payload.len() < *cursor + len {
        return Err(CodecError::TooShort { need: *cursor + len, got: payload.len() });
    }
    let s = std::str::from_utf8(&payload[*cursor..*cursor + len])
        .map_err(|_| CodecError::InvalidUtf8)?
        .to_string();
    *cursor += len;
    Ok(s)
}

fn frame(kind: PacketKind, message_type: MessageType, sequence_id: u16, tick_id: u32, payload: Vec<u8>) -> Vec<u8> {
    let header = PacketHeader::new(kind, message_type, sequence_id, tick_id, payload.len() as u16);
    encode_frame(&header, &payload)
}

fn payload_of(bytes: &[u8], expected: MessageType) -> Result<(PacketHeader, &[u8]), CodecError> {
    let (header, payload) = decode_frame(bytes)?;
    if header.message_type != expected {
        return Err(CodecError::UnknownMessageType {
            value: header.message_type.to_byte(),
        });
    }
    Ok((header, payload))
}

/// A client joining a room with a display name.
pub fn encode_client_join(sequence_id: u16, player_name: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    write_string(&mut payload, player_name);
    frame(PacketKind::ClientToServer, MessageType::ClientJoin, sequence_id, 0, payload)
}

pub fn decode_client_join(bytes: &[u8]) -> Result<String, CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::ClientJoin)?;
    let mut cursor = 0;
    read_string(payload, &mut cursor)
}

pub fn encode_client_ready(sequence_id: u16) -> Vec<u8> {
    frame(PacketKind::ClientToServer, MessageType::ClientReady, sequence_id, 0, Vec::new())
}

pub fn encode_client_ping(sequence_id: u16, timestamp_ms: u32) -> Vec<u8> {
    frame(
        PacketKind::ClientToServer,
        MessageType::ClientPing,
        sequence_id,
        0,
        timestamp_ms.to_be_bytes().to_vec(),
    )
}

pub fn decode_client_ping(bytes: &[u8]) -> Result<u32, CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::ClientPing)?;
    if payload.len() != 4 {
        return Err(CodecError::PayloadSizeMismatch { expected: 4, actual: payload.len() });
    }
    Ok(u32::from_be_bytes(payload.try_into().unwrap()))
}

/// `ClientChecksum{tick, checksum}` per spec §4.7: the client's predicted
/// state checksum for a given server tick, sent periodically so
/// `rtype_net::desync::DesyncDetector` can compare it against the
/// server-authoritative checksum for that same tick.
pub fn encode_client_checksum(sequence_id: u16, tick: u32, checksum: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8);
    payload.extend_from_slice(&tick.to_be_bytes());
    payload.extend_from_slice(&checksum.to_be_bytes());
    frame(PacketKind::ClientToServer, MessageType::ClientChecksum, sequence_id, tick, payload)
}

pub fn decode_client_checksum(bytes: &[u8]) -> Result<(u32, u32), CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::ClientChecksum)?;
    if payload.len() != 8 {
        return Err(CodecError::PayloadSizeMismatch { expected: 8, actual: payload.len() });
    }
    let tick = u32::from_be_bytes(payload[0..4].try_into().unwrap());
    let checksum = u32::from_be_bytes(payload[4..8].try_into().unwrap());
    Ok((tick, checksum))
}

pub fn encode_server_hello(sequence_id: u16) -> Vec<u8> {
    frame(PacketKind::ServerToClient, MessageType::ServerHello, sequence_id, 0, Vec::new())
}

pub fn encode_join_accept(sequence_id: u16, player_id: u32) -> Vec<u8> {
    frame(
        PacketKind::ServerToClient,
        MessageType::ServerJoinAccept,
        sequence_id,
        0,
        player_id.to_be_bytes().to_vec(),
    )
}

pub fn decode_join_accept(bytes: &[u8]) -> Result<u32, CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::ServerJoinAccept)?;
    if payload.len() != 4 {
        return Err(CodecError::PayloadSizeMismatch { expected: 4, actual: payload.len() });
    }
    Ok(u32::from_be_bytes(payload.try_into().unwrap()))
}

pub fn encode_join_deny(sequence_id: u16, reason: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    write_string(&mut payload, reason);
    frame(PacketKind::ServerToClient, MessageType::ServerJoinDeny, sequence_id, 0, payload)
}

pub fn encode_all_ready(sequence_id: u16) -> Vec<u8> {
    frame(PacketKind::ServerToClient, MessageType::AllReady, sequence_id, 0, Vec::new())
}

pub fn encode_countdown_tick(sequence_id: u16, n: u8) -> Vec<u8> {
    frame(PacketKind::ServerToClient, MessageType::CountdownTick, sequence_id, 0, vec![n])
}

pub fn decode_countdown_tick(bytes: &[u8]) -> Result<u8, CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::CountdownTick)?;
    payload.first().copied().ok_or(CodecError::TooShort { need: 1, got: 0 })
}

pub fn encode_game_start(sequence_id: u16, seed: u32) -> Vec<u8> {
    frame(
        PacketKind::ServerToClient,
        MessageType::GameStart,
        sequence_id,
        0,
        seed.to_be_bytes().to_vec(),
    )
}

pub fn encode_server_pong(sequence_id: u16, echoed_timestamp_ms: u32) -> Vec<u8> {
    frame(
        PacketKind::ServerToClient,
        MessageType::ServerPong,
        sequence_id,
        0,
        echoed_timestamp_ms.to_be_bytes().to_vec(),
    )
}

/// One archetype table entry: a `typeId` translation to client-side
/// sprite/anim/layer metadata (spec §3, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct WireArchetype {
    pub type_id: u16,
    pub sprite_id: String,
    pub anim_id: String,
    pub layer: u8,
}

/// Emitted once per game start: level id, seed, background/music ids, and
/// the full archetype table. The client treats an absent archetype id
/// lookup as a protocol error (spec §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct LevelInit {
    pub level_id: u16,
    pub seed: u32,
    pub background_id: String,
    pub music_id: String,
    pub archetypes: Vec<WireArchetype>,
}

pub fn encode_level_init(sequence_id: u16, init: &LevelInit) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&init.level_id.to_be_bytes());
    payload.extend_from_slice(&init.seed.to_be_bytes());
    write_string(&mut payload, &init.background_id);
    write_string(&mut payload, &init.music_id);
    payload.extend_from_slice(&(init.archetypes.len() as u16).to_be_bytes());
    for a in &init.archetypes {
        payload.extend_from_slice(&a.type_id.to_be_bytes());
        write_string(&mut payload, &a.sprite_id);
        write_string(&mut payload, &a.anim_id);
        payload.push(a.layer);
    }
    frame(PacketKind::ServerToClient, MessageType::LevelInit, sequence_id, 0, payload)
}

pub fn decode_level_init(bytes: &[u8]) -> Result<LevelInit, CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::LevelInit)?;
    let mut cursor = 0usize;
    if payload.len() < cursor + 6 {
        return Err(CodecError::TooShort { need: cursor + 6, got: payload.len() });
    }
    let level_id = u16::from_be_bytes(payload[cursor..cursor + 2].try_into().unwrap());
    cursor += 2;
    let seed = u32::from_be_bytes(payload[cursor..cursor + 4].try_into().unwrap());
    cursor += 4;
    let background_id = read_string(payload, &mut cursor)?;
    let music_id = read_string(payload, &mut cursor)?;
    if payload.len() < cursor + 2 {
        return Err(CodecError::TooShort { need: cursor + 2, got: payload.len() });
    }
    let count = u16::from_be_bytes(payload[cursor..cursor + 2].try_into().unwrap()) as usize;
    cursor += 2;
    let mut archetypes = Vec::with_capacity(count);
    for _ in 0..count {
        if payload.len() < cursor + 2 {
            return Err(CodecError::TooShort { need: cursor + 2, got: payload.len() });
        }
        let type_id = u16::from_be_bytes(payload[cursor..cursor + 2].try_into().unwrap());
        cursor += 2;
        let sprite_id = read_string(payload, &mut cursor)?;
        let anim_id = read_string(payload, &mut cursor)?;
        if payload.len() < cursor + 1 {
            return Err(CodecError::TooShort { need: cursor + 1, got: payload.len() });
        }
        let layer = payload[cursor];
        cursor += 1;
        archetypes.push(WireArchetype { type_id, sprite_id, anim_id, layer });
    }
    Ok(LevelInit {
        level_id,
        seed,
        background_id,
        music_id,
        archetypes,
    })
}

/// A client-visible level event forwarded verbatim for presentation (e.g.
/// `SetBackground`/`SetMusic`); most director events never reach the wire
/// because they only affect server-side spawn/bounds state.
#[derive(Debug, Clone, PartialEq)]
pub struct WireLevelEvent {
    pub segment_id: String,
    pub label: String,
}

pub fn encode_level_event(sequence_id: u16, tick: u32, event: &WireLevelEvent) -> Vec<u8> {
    let mut payload = Vec::new();
    write_string(&mut payload, &event.segment_id);
    write_string(&mut payload, &event.label);
    frame(PacketKind::ServerToClient, MessageType::LevelEvent, sequence_id, tick, payload)
}

pub fn decode_level_event(bytes: &[u8]) -> Result<WireLevelEvent, CodecError> {
    let (_, payload) = payload_of(bytes, MessageType::LevelEvent)?;
    let mut cursor = 0;
    let segment_id = read_string(payload, &mut cursor)?;
    let label = read_string(payload, &mut cursor)?;
    Ok(WireLevelEvent { segment_id, label })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_round_trips_name() {
        let frame = encode_client_join(1, "Bydos");
        assert_eq!(decode_client_join(&frame).unwrap(), "Bydos");
    }

    #[test]
    fn checksum_round_trips() {
        let frame = encode_client_checksum(1, 60, 0xDEADBEEF);
        assert_eq!(decode_client_checksum(&frame).unwrap(), (60, 0xDEADBEEF));
    }

    #[test]
    fn level_init_round_trips_archetype_table() {
        let init = LevelInit {
            level_id: 1,
            seed: 42,
            background_id: "bg_space".into(),
            music_id: "theme_1".into(),
            archetypes: vec![
                WireArchetype { type_id: 1, sprite_id: "player_r".into(), anim_id: "idle".into(), layer: 5 },
                WireArchetype { type_id: 3, sprite_id: "bullet".into(), anim_id: "fly".into(), layer: 4 },
            ],
        };
        let frame = encode_level_init(1, &init);
        assert_eq!(decode_level_init(&frame).unwrap(), init);
    }

    #[test]
    fn wrong_message_type_is_rejected() {
        let frame = encode_client_ready(1);
        assert!(decode_client_join(&frame).is_err());
    }
}
