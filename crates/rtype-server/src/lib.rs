//! Room and session management, wire-control dispatch, and the
//! three-thread-per-room concurrency model (receive / game loop / send)
//! that hosts authoritative `rtype` matches over UDP.

pub mod config;
pub mod error;
pub mod game_loop;
pub mod instance;
pub mod net_threads;
pub mod room;
pub mod session;

pub use config::ServerConfig;
pub use error::ServerError;
pub use game_loop::GameLoopThread;
pub use instance::{GameInstance, GameInstanceSettings, GameState};
pub use net_threads::{OutboundPacket, RawControlPacket, ReceiveThread, ReceivedInput, SendThread};
pub use room::{RoomConfig, RoomDifficulty};
pub use session::{can_kick, can_promote, ClientSession, PlayerRole};
