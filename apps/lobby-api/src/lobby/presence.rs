//! Per-session presence: what the user is doing and which table it concerns.
//!
//! A session references a table exactly when its status is not `Lobby`. The
//! pair is only ever replaced as a whole, so readers never see a status that
//! disagrees with the table reference.

use std::fmt;

use serde::Serialize;

use crate::models::table::{TableId, UserId};

/// What a session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Lobby,
    Playing,
    Spectating,
    Replay,
    SharedReplay,
}

impl Status {
    /// Spectators and replay viewers leave by dropping out of the spectator
    /// list; everybody else holds a player seat.
    pub fn is_spectating(self) -> bool {
        matches!(self, Status::Spectating | Status::Replay | Status::SharedReplay)
    }

    /// Display name shown in the lobby.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Lobby => "Lobby",
            Status::Playing => "Playing",
            Status::Spectating => "Spectating",
            Status::Replay => "Replay",
            Status::SharedReplay => "Shared Replay",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a table reference is paired with the `Lobby` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status \"{0}\" cannot reference a table")]
pub struct InvalidPresence(pub Status);

/// Status plus the table it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    status: Status,
    table_id: Option<TableId>,
}

impl Presence {
    pub const LOBBY: Presence = Presence {
        status: Status::Lobby,
        table_id: None,
    };

    pub fn at_table(status: Status, table_id: TableId) -> Result<Self, InvalidPresence> {
        if status == Status::Lobby {
            return Err(InvalidPresence(status));
        }
        Ok(Self {
            status,
            table_id: Some(table_id),
        })
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::LOBBY
    }
}

/// A user's entry in the lobby-wide roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub username: String,
    pub status: Status,
    pub table_id: Option<TableId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_has_no_table() {
        assert_eq!(Presence::default(), Presence::LOBBY);
        assert_eq!(Presence::LOBBY.status(), Status::Lobby);
        assert!(Presence::LOBBY.table_id().is_none());
    }

    #[test]
    fn at_table_rejects_lobby_status() {
        assert_eq!(
            Presence::at_table(Status::Lobby, 3),
            Err(InvalidPresence(Status::Lobby))
        );
    }

    #[test]
    fn at_table_keeps_status_and_table() {
        let presence = Presence::at_table(Status::SharedReplay, 42).unwrap();
        assert_eq!(presence.status(), Status::SharedReplay);
        assert_eq!(presence.table_id(), Some(42));
    }

    #[test]
    fn spectating_statuses() {
        assert!(Status::Spectating.is_spectating());
        assert!(Status::Replay.is_spectating());
        assert!(Status::SharedReplay.is_spectating());
        assert!(!Status::Playing.is_spectating());
        assert!(!Status::Lobby.is_spectating());
    }

    #[test]
    fn status_display_names() {
        assert_eq!(Status::SharedReplay.to_string(), "Shared Replay");
        assert_eq!(Status::Replay.to_string(), "Replay");
        assert_eq!(
            serde_json::to_value(Status::SharedReplay).unwrap(),
            "shared_replay"
        );
    }
}
