use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

pub type TableId = u64;
pub type UserId = u64;

/// A seat in the game itself. Membership is permanent while the table
/// exists; `present` tracks whether the user is currently looking at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    pub present: bool,
}

/// An observer of a live game or a replay. Being listed is being there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Spectator {
    pub user_id: UserId,
    pub username: String,
}

/// A game or replay room.
///
/// Player and spectator counts are bounded by the game's seat limits, so the
/// lookups below are plain linear scans.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    /// Replay/review rooms have no gameplay and are deleted once the last
    /// spectator leaves.
    pub replay: bool,
    pub running: bool,
    pub players: Vec<Player>,
    pub spectators: Vec<Spectator>,
    pub created_at: DateTime<Utc>,
}

impl Table {
    /// A live game that has not started yet.
    pub fn game(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            replay: false,
            running: false,
            players: Vec::new(),
            spectators: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A replay/review room.
    pub fn replay(id: TableId, name: impl Into<String>) -> Self {
        Self {
            replay: true,
            ..Self::game(id, name)
        }
    }

    /// Seat a player. Returns false if the user already holds a seat.
    pub fn add_player(&mut self, user_id: UserId, username: impl Into<String>) -> bool {
        if self.player_index(user_id).is_some() {
            return false;
        }
        self.players.push(Player {
            user_id,
            username: username.into(),
            present: true,
        });
        true
    }

    /// Add a spectator. Returns false if the user is already watching.
    pub fn add_spectator(&mut self, user_id: UserId, username: impl Into<String>) -> bool {
        if self.spectator_index(user_id).is_some() {
            return false;
        }
        self.spectators.push(Spectator {
            user_id,
            username: username.into(),
        });
        true
    }

    pub fn player_index(&self, user_id: UserId) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn spectator_index(&self, user_id: UserId) -> Option<usize> {
        self.spectators.iter().position(|s| s.user_id == user_id)
    }

    /// Remove the spectator at `index`, keeping the others in order.
    pub fn remove_spectator(&mut self, index: usize) -> Spectator {
        self.spectators.remove(index)
    }

    /// A replay nobody is watching any more.
    pub fn is_abandoned_replay(&self) -> bool {
        self.replay && self.spectators.is_empty()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            id: self.id,
            name: self.name.clone(),
            replay: self.replay,
            running: self.running,
            players: self.players.clone(),
            spectators: self.spectators.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public view of a table, as shown in the lobby list and sent as a snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableSummary {
    pub id: TableId,
    pub name: String,
    pub replay: bool,
    pub running: bool,
    pub players: Vec<Player>,
    pub spectators: Vec<Spectator>,
    pub created_at: DateTime<Utc>,
}
