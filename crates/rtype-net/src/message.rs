//! The message type catalogue from spec §4.6, carried as the header's
//! second byte.

use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    ClientHello,
    ClientJoin,
    ClientReady,
    ClientInput,
    ClientPing,
    ClientChecksum,
    ServerHello,
    ServerJoinAccept,
    ServerJoinDeny,
    AllReady,
    CountdownTick,
    GameStart,
    LevelInit,
    LevelEvent,
    Snapshot,
    SnapshotDelta,
    ServerPong,
}

impl MessageType {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            MessageType::ClientHello => 0,
            MessageType::ClientJoin => 1,
            MessageType::ClientReady => 2,
            MessageType::ClientInput => 3,
            MessageType::ClientPing => 4,
            MessageType::ClientChecksum => 5,
            MessageType::ServerHello => 6,
            MessageType::ServerJoinAccept => 7,
            MessageType::ServerJoinDeny => 8,
            MessageType::AllReady => 9,
            MessageType::CountdownTick => 10,
            MessageType::GameStart => 11,
            MessageType::LevelInit => 12,
            MessageType::LevelEvent => 13,
            MessageType::Snapshot => 14,
            MessageType::SnapshotDelta => 15,
            MessageType::ServerPong => 16,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Result<Self, CodecError> {
        Ok(match b {
            0 => MessageType::ClientHello,
            1 => MessageType::ClientJoin,
            2 => MessageType::ClientReady,
            3 => MessageType::ClientInput,
            4 => MessageType::ClientPing,
            5 => MessageType::ClientChecksum,
            6 => MessageType::ServerHello,
            7 => MessageType::ServerJoinAccept,
            8 => MessageType::ServerJoinDeny,
            9 => MessageType::AllReady,
            10 => MessageType::CountdownTick,
            11 => MessageType::GameStart,
            12 => MessageType::LevelInit,
            13 => MessageType::LevelEvent,
            14 => MessageType::Snapshot,
            15 => MessageType::SnapshotDelta,
            16 => MessageType::ServerPong,
            other => return Err(CodecError::UnknownMessageType { value: other }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_byte() {
        let all = [
            MessageType::ClientHello,
            MessageType::ClientJoin,
            MessageType::ClientReady,
            MessageType::ClientInput,
            MessageType::ClientPing,
            MessageType::ClientChecksum,
            MessageType::ServerHello,
            MessageType::ServerJoinAccept,
            MessageType::ServerJoinDeny,
            MessageType::AllReady,
            MessageType::CountdownTick,
            MessageType::GameStart,
            MessageType::LevelInit,
            MessageType::LevelEvent,
            MessageType::Snapshot,
            MessageType::SnapshotDelta,
            MessageType::ServerPong,
        ];
        for m in all {
            assert_eq!(MessageType::from_byte(m.to_byte()).unwrap(), m);
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert!(matches!(
            MessageType::from_byte(200),
            Err(CodecError::UnknownMessageType { value: 200 })
        ));
    }
}
