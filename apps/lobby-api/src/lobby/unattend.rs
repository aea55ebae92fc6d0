//! Leaving a table and going back to the lobby.
//!
//! The caller snapshots and resets the session's presence first
//! (`LobbySession::leave_table`) and passes the snapshot in. From there a
//! departure is one of:
//!
//! - no table: a duplicate or late signal, logged and ignored;
//! - spectator: dropped from the spectator list, and a replay left empty is
//!   deleted;
//! - player: marked absent, keeping the seat.
//!
//! Failures are reported to the departing session only.

use crate::models::table::{Table, TableId};

use super::fanout::Notifier;
use super::presence::{Presence, Status};
use super::registry::TableRegistry;
use super::session::SessionOutbox;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnattendError {
    #[error("Table {table_id} does not exist, so you cannot unattend it.")]
    TableNotFound { table_id: TableId },
    #[error(
        "You are not in the spectators list, even though you were marked as having \
         status \"{status}\" in table {table_id}."
    )]
    NotSpectating { table_id: TableId, status: Status },
    #[error("You are not in table {table_id}, so you cannot unattend it.")]
    NotPlaying { table_id: TableId },
}

/// How a departure was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The session had no table to leave.
    NoTable,
    SpectatorLeft { table_id: TableId, remaining: usize },
    /// The last viewer left a replay, which no longer exists.
    ReplayClosed { table_id: TableId },
    PlayerAway { table_id: TableId, running: bool },
}

/// Process a departure for a session whose presence was already reset.
///
/// Errors have been reported to the session by the time this returns; the
/// `Err` is informational for the caller.
pub fn handle_unattend(
    tables: &TableRegistry,
    notifier: &dyn Notifier,
    session: &dyn SessionOutbox,
    prior: Presence,
) -> Result<Departure, UnattendError> {
    notifier.session_roster_changed(&session.roster_entry());

    let Some(table_id) = prior.table_id() else {
        // Replay ended through idleness, or a second unattend after lag.
        tracing::info!(
            user_id = session.user_id(),
            username = session.username(),
            "unattend without a table, nothing to leave"
        );
        return Ok(Departure::NoTable);
    };

    let result = unattend_table(tables, notifier, session, prior.status(), table_id);
    if let Err(err) = &result {
        tracing::warn!(
            user_id = session.user_id(),
            table_id,
            status = %prior.status(),
            %err,
            "unattend rejected"
        );
        session.report_error(&err.to_string());
    }
    result
}

fn unattend_table(
    tables: &TableRegistry,
    notifier: &dyn Notifier,
    session: &dyn SessionOutbox,
    status: Status,
    table_id: TableId,
) -> Result<Departure, UnattendError> {
    let shared = tables
        .get(table_id)
        .ok_or(UnattendError::TableNotFound { table_id })?;
    let mut table = shared.lock();

    // Deleted between the lookup and the lock.
    if !tables.holds(table_id, &shared) {
        return Err(UnattendError::TableNotFound { table_id });
    }

    if status.is_spectating() {
        leave_as_spectator(tables, notifier, session, status, &mut table)
    } else {
        leave_as_player(notifier, session, &mut table)
    }
}

fn leave_as_spectator(
    tables: &TableRegistry,
    notifier: &dyn Notifier,
    session: &dyn SessionOutbox,
    status: Status,
    table: &mut Table,
) -> Result<Departure, UnattendError> {
    let table_id = table.id;
    let index = table
        .spectator_index(session.user_id())
        .ok_or(UnattendError::NotSpectating { table_id, status })?;

    table.remove_spectator(index);
    notifier.lobby_table_changed(table);
    notifier.table_spectators(table);

    if table.is_abandoned_replay() {
        tables.remove(table_id);
        tracing::info!(table_id, "ended replay because everyone left");
        notifier.lobby_table_removed(table);
        return Ok(Departure::ReplayClosed { table_id });
    }

    Ok(Departure::SpectatorLeft {
        table_id,
        remaining: table.spectators.len(),
    })
}

fn leave_as_player(
    notifier: &dyn Notifier,
    session: &dyn SessionOutbox,
    table: &mut Table,
) -> Result<Departure, UnattendError> {
    let table_id = table.id;
    let index = table
        .player_index(session.user_id())
        .ok_or(UnattendError::NotPlaying { table_id })?;

    // Shown as disconnected in a running game, as away before it starts.
    table.players[index].present = false;
    if table.running {
        notifier.table_connection_changed(table);
    } else {
        notifier.table_players_changed(table);
    }

    // A started game already told them the table was gone; resend it.
    session.send_table_snapshot(table);

    Ok(Departure::PlayerAway {
        table_id,
        running: table.running,
    })
}
