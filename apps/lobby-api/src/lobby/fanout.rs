//! Broadcast hub for lobby and table notifications.
//!
//! Uses a single `tokio::sync::broadcast` channel. Every connected session
//! subscribes and filters payloads locally by audience.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::models::table::{Table, TableId};

use super::events::EventName;
use super::presence::RosterEntry;

/// Who a payload is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connected session.
    Lobby,
    /// Sessions currently attached to the table.
    Table(TableId),
}

/// A payload broadcast to all connected gateway sessions.
#[derive(Debug, Clone)]
pub struct BroadcastPayload {
    pub audience: Audience,
    pub event_name: &'static str,
    pub data: Value,
}

/// Serialize an event payload, falling back to `null` if that fails.
pub(crate) fn to_payload<T: Serialize>(event_name: &'static str, value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(event_name, %err, "failed to serialize event payload");
            Value::Null
        }
    }
}

/// Notifications a table transition can trigger.
///
/// Delivery is fire-and-forget: implementations must not block and must not
/// fail because nobody is listening.
pub trait Notifier: Send + Sync {
    /// A table row in the lobby list changed.
    fn lobby_table_changed(&self, table: &Table);
    /// A table no longer exists.
    fn lobby_table_removed(&self, table: &Table);
    /// The table's spectator roster changed.
    fn table_spectators(&self, table: &Table);
    /// A running game's player presence changed.
    fn table_connection_changed(&self, table: &Table);
    /// The player list of a game that has not started changed.
    fn table_players_changed(&self, table: &Table);
    /// A user's lobby roster entry changed.
    fn session_roster_changed(&self, entry: &RosterEntry);
}

/// The global broadcast hub. Cloneable; stored in `AppState`.
#[derive(Clone)]
pub struct LobbyBroadcast {
    sender: broadcast::Sender<Arc<BroadcastPayload>>,
}

impl LobbyBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the broadcast channel. Each gateway session calls this
    /// once to get its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastPayload>> {
        self.sender.subscribe()
    }

    pub fn dispatch(&self, audience: Audience, event_name: &'static str, data: Value) {
        // send() returns Err if there are no receivers; nobody to tell.
        let _ = self.sender.send(Arc::new(BroadcastPayload {
            audience,
            event_name,
            data,
        }));
    }
}

impl Notifier for LobbyBroadcast {
    fn lobby_table_changed(&self, table: &Table) {
        let data = to_payload(EventName::TABLE, &table.summary());
        self.dispatch(Audience::Lobby, EventName::TABLE, data);
    }

    fn lobby_table_removed(&self, table: &Table) {
        self.dispatch(
            Audience::Lobby,
            EventName::TABLE_GONE,
            serde_json::json!({ "id": table.id }),
        );
    }

    fn table_spectators(&self, table: &Table) {
        let names: Vec<&str> = table.spectators.iter().map(|s| s.username.as_str()).collect();
        self.dispatch(
            Audience::Table(table.id),
            EventName::SPECTATORS,
            serde_json::json!({ "table_id": table.id, "names": names }),
        );
    }

    fn table_connection_changed(&self, table: &Table) {
        let list: Vec<bool> = table.players.iter().map(|p| p.present).collect();
        self.dispatch(
            Audience::Table(table.id),
            EventName::CONNECTED,
            serde_json::json!({ "table_id": table.id, "list": list }),
        );
    }

    fn table_players_changed(&self, table: &Table) {
        self.dispatch(
            Audience::Table(table.id),
            EventName::GAME_PLAYERS,
            serde_json::json!({ "table_id": table.id, "players": table.players }),
        );
    }

    fn session_roster_changed(&self, entry: &RosterEntry) {
        let data = to_payload(EventName::USER, entry);
        self.dispatch(Audience::Lobby, EventName::USER, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::presence::Status;

    fn sample_table() -> Table {
        let mut table = Table::game(7, "seven");
        table.add_player(1, "alice");
        table.add_player(2, "bob");
        table.players[0].present = false;
        table.add_spectator(3, "carol");
        table
    }

    #[test]
    fn unserializable_payload_becomes_null() {
        // JSON object keys must be strings.
        let mut bad = std::collections::HashMap::new();
        bad.insert((1u8, 2u8), "pair");

        assert_eq!(to_payload(EventName::TABLE, &bad), Value::Null);
        assert_eq!(
            to_payload(EventName::TABLE, &serde_json::json!({ "id": 1 })),
            serde_json::json!({ "id": 1 })
        );
    }

    #[test]
    fn dispatch_without_receivers_does_not_panic() {
        let hub = LobbyBroadcast::new(8);
        hub.lobby_table_changed(&sample_table());
    }

    #[tokio::test]
    async fn connection_change_targets_table_audience() {
        let hub = LobbyBroadcast::new(8);
        let mut rx = hub.subscribe();

        hub.table_connection_changed(&sample_table());

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.audience, Audience::Table(7));
        assert_eq!(payload.event_name, EventName::CONNECTED);
        assert_eq!(payload.data["list"], serde_json::json!([false, true]));
    }

    #[tokio::test]
    async fn table_removed_targets_lobby() {
        let hub = LobbyBroadcast::new(8);
        let mut rx = hub.subscribe();

        hub.lobby_table_removed(&sample_table());

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.audience, Audience::Lobby);
        assert_eq!(payload.event_name, EventName::TABLE_GONE);
        assert_eq!(payload.data["id"], 7);
    }

    #[tokio::test]
    async fn spectators_payload_lists_names_in_order() {
        let hub = LobbyBroadcast::new(8);
        let mut rx = hub.subscribe();
        let mut table = sample_table();
        table.add_spectator(4, "dave");

        hub.table_spectators(&table);

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.data["names"], serde_json::json!(["carol", "dave"]));
    }

    #[tokio::test]
    async fn roster_entry_is_sent_to_everyone() {
        let hub = LobbyBroadcast::new(8);
        let mut rx = hub.subscribe();

        hub.session_roster_changed(&RosterEntry {
            user_id: 1,
            username: "alice".to_string(),
            status: Status::Lobby,
            table_id: None,
        });

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.audience, Audience::Lobby);
        assert_eq!(payload.event_name, EventName::USER);
        assert_eq!(payload.data["status"], "lobby");
        assert!(payload.data["table_id"].is_null());
    }
}
