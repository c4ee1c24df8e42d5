//! `rtype-server`: hosts a single room of authoritative `rtype` simulation
//! over UDP. Binds one socket, loads one level, and runs the
//! receive/game-loop/send thread trio until killed.

use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rtype_server::config::{ServerConfig, TICK_RATE_HZ};
use rtype_server::game_loop::GameLoopThread;
use rtype_server::instance::{GameInstance, GameInstanceSettings};
use rtype_server::net_threads::{ReceiveThread, SendThread};
use rtype_server::room::RoomConfig;

/// One `rtype` room, listening on a single UDP port.
#[derive(Parser, Debug)]
#[command(name = "rtype-server", about = "Authoritative rtype game server")]
struct Cli {
    /// Path to an optional JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// UDP port to bind; overrides the config file's base_port.
    #[arg(long)]
    port: Option<u16>,

    /// Room difficulty preset.
    #[arg(long)]
    difficulty: Option<String>,

    /// Level id to load from level_dir.
    #[arg(long, default_value_t = 1)]
    level_id: i32,

    /// Directory containing level JSON files; overrides the config file.
    #[arg(long)]
    level_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.base_port = port;
    }
    if let Some(dir) = cli.level_dir {
        config.level_dir = dir;
    }

    let difficulty = match cli.difficulty.as_deref() {
        Some("noob") => rtype_server::room::RoomDifficulty::Noob,
        Some("hell") => rtype_server::room::RoomDifficulty::Hell,
        Some("nightmare") => rtype_server::room::RoomDifficulty::Nightmare,
        Some("custom") => rtype_server::room::RoomDifficulty::Custom,
        Some(other) => {
            warn!(difficulty = other, "unknown difficulty, falling back to configured default");
            config.default_difficulty
        }
        None => config.default_difficulty,
    };
    let room_config = RoomConfig::preset(difficulty);

    let level = rtype_level::loader::load_level(&config.level_dir, cli.level_id)?;
    let level = Arc::new(level);
    info!(level_id = cli.level_id, segments = level.segments.len(), "level loaded");

    let bind_addr = std::net::SocketAddr::new(config.bind_address, config.base_port);
    let socket = UdpSocket::bind(bind_addr)?;
    let send_socket = socket.try_clone()?;
    info!(%bind_addr, "room listening");

    let (input_tx, input_rx) = crossbeam_channel::bounded(1024);
    let (control_tx, control_rx) = crossbeam_channel::bounded(256);
    let (outbound_tx, outbound_rx) = crossbeam_channel::bounded(1024);

    let receive_thread = ReceiveThread::spawn(socket, input_tx, control_tx)?;
    let send_thread = SendThread::spawn(send_socket, outbound_rx);

    let seed: u32 = rand::thread_rng().gen();
    let settings = GameInstanceSettings {
        full_state_interval: config.full_state_interval,
        max_packet_bytes: config.max_packet_bytes,
        rollback_capacity: config.rollback_capacity,
        checksum_interval: config.checksum_interval,
        timeout_threshold: config.timeout_threshold,
    };
    let instance = GameInstance::new(0, room_config, level, seed, outbound_tx, settings);

    let desync = instance.desync_detector().clone();
    desync.set_desync_callback(Box::new(|info| {
        warn!(
            player_id = info.player_id,
            tick = info.tick,
            desync_type = ?info.desync_type,
            description = %info.description,
            "desync detected"
        );
    }));

    let game_loop = GameLoopThread::spawn(instance, input_rx, control_rx, TICK_RATE_HZ);

    // Runs until the process is killed; the room has no scripted shutdown.
    std::thread::park();

    game_loop.stop();
    receive_thread.stop();
    send_thread.stop();
    Ok(())
}
