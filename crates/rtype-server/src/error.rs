//! Top-level error taxonomy for the server binary and its room machinery.

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind room {room_id} to {addr}: {source}")]
    Bind {
        room_id: u32,
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("level error: {0}")]
    Level(#[from] rtype_level::LevelError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
