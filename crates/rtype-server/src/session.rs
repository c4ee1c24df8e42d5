//! Per-player session bookkeeping: role, endpoint, and lobby-ready state.

use std::net::SocketAddr;

/// A player's standing within a room. The room's creator starts as
/// `Owner`; everyone else starts as `Member` until promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone)]
pub struct ClientSession {
    pub player_id: u32,
    pub endpoint: SocketAddr,
    pub name: String,
    pub role: PlayerRole,
    pub ready: bool,
    pub last_sequence_id: u16,
}

impl ClientSession {
    pub fn new(player_id: u32, endpoint: SocketAddr, name: String, role: PlayerRole) -> Self {
        Self {
            player_id,
            endpoint,
            name,
            role,
            ready: false,
            last_sequence_id: 0,
        }
    }
}

/// The owner, or an admin, may kick anyone except another admin or the
/// owner. Only the owner may promote or demote.
pub fn can_kick(kicker: PlayerRole, target: PlayerRole) -> bool {
    match kicker {
        PlayerRole::Owner => target != PlayerRole::Owner,
        PlayerRole::Admin => target == PlayerRole::Member,
        PlayerRole::Member => false,
    }
}

pub fn can_promote(promoter: PlayerRole) -> bool {
    promoter == PlayerRole::Owner
}
