//! Wire-format error taxonomy. Every variant here is a *protocol* error per
//! the design note in the engineering spec: the caller's policy is to drop
//! the packet silently (`tracing::debug!`) and never acknowledge it, never
//! to propagate a hard failure up the receive thread.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CodecError {
    #[error("packet too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("CRC32 mismatch: header claimed {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("payload size mismatch: header said {expected}, frame had {actual}")]
    PayloadSizeMismatch { expected: u16, actual: usize },

    #[error("unknown message type byte {value}")]
    UnknownMessageType { value: u8 },

    #[error("unknown packet kind byte {value}")]
    UnknownPacketKind { value: u8 },

    #[error("unknown input flag bits {bits:#06x}")]
    UnknownFlagBits { bits: u16 },

    #[error("non-finite float field in payload")]
    NonFiniteField,

    #[error("invalid UTF-8 in length-prefixed string field")]
    InvalidUtf8,
}
