//! Server-wide configuration, loaded from an optional JSON file and
//! overridable from the CLI. Every field defaults to the constants the
//! original implementation hard-codes.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ServerError;
use crate::room::RoomDifficulty;

/// Ticks per second; fixed across the whole deployment, never per-room.
pub const TICK_RATE_HZ: f64 = 60.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub base_port: u16,
    pub port_range: u16,
    pub default_difficulty: RoomDifficulty,
    pub level_dir: PathBuf,
    pub full_state_interval: u32,
    pub checksum_interval: u32,
    pub timeout_threshold: u32,
    pub rollback_capacity: usize,
    pub max_packet_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            base_port: 4242,
            port_range: 256,
            default_difficulty: RoomDifficulty::Hell,
            level_dir: PathBuf::from("levels"),
            full_state_interval: rtype_net::FULL_STATE_INTERVAL,
            checksum_interval: rtype_net::desync::DEFAULT_CHECKSUM_INTERVAL,
            timeout_threshold: rtype_net::desync::DEFAULT_TIMEOUT_THRESHOLD,
            rollback_capacity: rtype_net::DEFAULT_CAPACITY,
            max_packet_bytes: rtype_net::MAX_PACKET_BYTES,
        }
    }
}

impl ServerConfig {
    /// Loads a config file (JSON; see the crate-level note on why no TOML
    /// crate is introduced here) layered over [`ServerConfig::default`].
    /// A missing file is not an error: the defaults apply.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }
}
