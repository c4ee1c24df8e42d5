//! UDP wire protocol, replication, rollback and desync detection for the
//! authoritative game server.
//!
//! This crate is transport-agnostic: it encodes and decodes byte buffers
//! and owns the replication/rollback/desync bookkeeping, but never opens a
//! socket itself. `rtype-server` drives it from its receive/game-loop/send
//! threads.

pub mod control;
pub mod desync;
pub mod error;
pub mod header;
pub mod input;
pub mod message;
pub mod replication;
pub mod rollback;
pub mod snapshot;

pub use desync::{DesyncCallback, DesyncDetector, DesyncInfo, DesyncType};
pub use error::CodecError;
pub use header::{decode_frame, encode_frame, PacketHeader, PacketKind, CRC_LEN, HEADER_LEN};
pub use input::{decode_input_packet, encode_input_packet, InputPacket, INPUT_PAYLOAD_LEN};
pub use message::MessageType;
pub use replication::{ReplicationManager, SyncResult, FULL_STATE_INTERVAL, MAX_PACKET_BYTES};
pub use rollback::{compute_checksum, RollbackEntry, RollbackRing, DEFAULT_CAPACITY};
pub use snapshot::{
    build_delta_snapshots, build_full_snapshot, decode_entries, field_mask, EntityStateCache,
    ReplicatedState, SnapshotEntry,
};
