//! Incoming opcode dispatch for IDENTIFY.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::AppState;

use super::events::{EventName, GatewayMessage, IdentifyPayload};
use super::session::{DirectMessage, LobbySession};

const MAX_USERNAME_LEN: usize = 32;

/// Process an IDENTIFY opcode.
///
/// Registers the new session and returns it with its direct-message receiver
/// and the READY message to send.
pub fn handle_identify(
    state: &AppState,
    payload: IdentifyPayload,
) -> Result<
    (
        Arc<LobbySession>,
        mpsc::UnboundedReceiver<DirectMessage>,
        GatewayMessage,
    ),
    &'static str,
> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err("Username is required");
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err("Username is too long");
    }

    let session_id = lobby_common::id::prefixed_ulid(lobby_common::id::prefix::SESSION);
    let (session, inbox) = LobbySession::new(session_id, payload.user_id, username.to_string());
    let session = Arc::new(session);

    let ready_data = serde_json::json!({
        "session_id": session.session_id,
        "user": {
            "id": session.user_id,
            "username": session.username,
        },
        "tables": state.tables.summaries(),
        "heartbeat_interval": state.config.heartbeat_interval_ms,
    });

    state.sessions.register(session.clone());

    let seq = session.next_seq();
    let ready_msg = GatewayMessage::dispatch(EventName::READY, seq, ready_data);

    Ok((session, inbox, ready_msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::table::Table;

    fn identify(user_id: u64, username: &str) -> IdentifyPayload {
        IdentifyPayload {
            user_id,
            username: username.to_string(),
        }
    }

    #[test]
    fn identify_registers_session_and_lists_tables() {
        let state = AppState::new(Config::default());
        state.tables.insert(Table::replay(42, "replay"));

        let (session, _inbox, ready) = handle_identify(&state, identify(1, "  alice ")).unwrap();

        assert_eq!(session.username, "alice");
        assert!(lobby_common::id::has_prefix(
            &session.session_id,
            lobby_common::id::prefix::SESSION
        ));
        assert!(state.sessions.get(&session.session_id).is_some());
        assert_eq!(ready.t.as_deref(), Some(EventName::READY));
        assert_eq!(ready.s, Some(1));
        assert_eq!(ready.d["tables"][0]["id"], 42);
        assert_eq!(ready.d["heartbeat_interval"], 41250);
    }

    #[test]
    fn identify_rejects_blank_username() {
        let state = AppState::new(Config::default());
        let result = handle_identify(&state, identify(1, "   "));
        assert_eq!(result.err(), Some("Username is required"));
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn identify_rejects_long_username() {
        let state = AppState::new(Config::default());
        let result = handle_identify(&state, identify(1, &"x".repeat(MAX_USERNAME_LEN + 1)));
        assert_eq!(result.err(), Some("Username is too long"));
    }
}
