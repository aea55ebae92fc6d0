//! Per-connection gateway session state.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::models::table::{Table, TableId, UserId};

use super::events::EventName;
use super::fanout::to_payload;
use super::presence::{InvalidPresence, Presence, RosterEntry, Status};

/// A message addressed to exactly one session.
#[derive(Debug, Clone)]
pub struct DirectMessage {
    pub event_name: &'static str,
    pub data: Value,
}

/// What a table transition may do to the session that triggered it.
pub trait SessionOutbox {
    fn user_id(&self) -> UserId;
    fn username(&self) -> &str;
    fn roster_entry(&self) -> RosterEntry;
    fn report_error(&self, message: &str);
    fn send_table_snapshot(&self, table: &Table);
}

/// State for a single WebSocket connection.
pub struct LobbySession {
    /// Unique session identifier (`ses_` prefixed ULID).
    pub session_id: String,
    pub user_id: UserId,
    pub username: String,
    presence: Mutex<Presence>,
    /// Monotonically increasing sequence number for dispatch events.
    seq: AtomicU64,
    outbox: mpsc::UnboundedSender<DirectMessage>,
}

impl LobbySession {
    /// Create a session in the lobby. The receiver yields messages addressed
    /// to this session alone and is drained by the connection loop.
    pub fn new(
        session_id: String,
        user_id: UserId,
        username: String,
    ) -> (Self, mpsc::UnboundedReceiver<DirectMessage>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let session = Self {
            session_id,
            user_id,
            username,
            presence: Mutex::new(Presence::LOBBY),
            seq: AtomicU64::new(0),
            outbox,
        };
        (session, inbox)
    }

    /// Get the next sequence number for a dispatch event.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn presence(&self) -> Presence {
        *self.presence.lock()
    }

    /// Attach the session to a table. Called by table formation.
    pub fn attend(&self, status: Status, table_id: TableId) -> Result<(), InvalidPresence> {
        let presence = Presence::at_table(status, table_id)?;
        *self.presence.lock() = presence;
        Ok(())
    }

    /// Send the session back to the lobby, returning where it was.
    ///
    /// Reading and resetting happen under one lock, so two racing departure
    /// signals see the table once between them.
    pub fn leave_table(&self) -> Presence {
        std::mem::replace(&mut *self.presence.lock(), Presence::LOBBY)
    }

    /// Whether table-scoped broadcasts for `table_id` concern this session.
    pub fn is_at_table(&self, table_id: TableId) -> bool {
        self.presence.lock().table_id() == Some(table_id)
    }

    fn send(&self, event_name: &'static str, data: Value) {
        // The connection loop is gone once the receiver drops.
        if self.outbox.send(DirectMessage { event_name, data }).is_err() {
            tracing::debug!(session_id = %self.session_id, event_name, "session outbox closed");
        }
    }
}

impl SessionOutbox for LobbySession {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn roster_entry(&self) -> RosterEntry {
        let presence = self.presence();
        RosterEntry {
            user_id: self.user_id,
            username: self.username.clone(),
            status: presence.status(),
            table_id: presence.table_id(),
        }
    }

    fn report_error(&self, message: &str) {
        self.send(EventName::ERROR, serde_json::json!({ "message": message }));
    }

    fn send_table_snapshot(&self, table: &Table) {
        let data = to_payload(EventName::TABLE_SNAPSHOT, &table.summary());
        self.send(EventName::TABLE_SNAPSHOT, data);
    }
}
