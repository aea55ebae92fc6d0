//! Shared registries of tables and connected sessions.
//!
//! Both use `DashMap` for shard-level concurrency. Each table additionally
//! sits behind its own `parking_lot::Mutex`, which is the critical section
//! for any transition touching that table.
//!
//! Lock order is table, then shard: a map guard is never held while a table
//! lock is being acquired.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::models::table::{Table, TableId, TableSummary, UserId};

use super::session::LobbySession;

pub type SharedTable = Arc<Mutex<Table>>;

/// Every table that currently exists, keyed by id.
pub struct TableRegistry {
    tables: DashMap<TableId, SharedTable>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Register a freshly formed table. Returns false if the id is taken.
    pub fn insert(&self, table: Table) -> bool {
        match self.tables.entry(table.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(table)));
                true
            }
        }
    }

    /// Look up a table. The map guard is released before returning.
    pub fn get(&self, table_id: TableId) -> Option<SharedTable> {
        self.tables.get(&table_id).map(|entry| entry.value().clone())
    }

    /// Whether `table_id` still maps to this exact table. Used after locking
    /// a table to detect that it was deleted in the meantime.
    pub fn holds(&self, table_id: TableId, table: &SharedTable) -> bool {
        self.tables
            .get(&table_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), table))
    }

    pub fn remove(&self, table_id: TableId) -> Option<SharedTable> {
        self.tables.remove(&table_id).map(|(_, table)| table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Summaries of every table, ordered by id.
    pub fn summaries(&self) -> Vec<TableSummary> {
        let tables: Vec<SharedTable> = self.tables.iter().map(|e| e.value().clone()).collect();
        let mut summaries: Vec<TableSummary> = tables.iter().map(|t| t.lock().summary()).collect();
        summaries.sort_by_key(|s| s.id);
        summaries
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Connected gateway sessions, keyed by session id.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<LobbySession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a session after IDENTIFY.
    pub fn register(&self, session: Arc<LobbySession>) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<LobbySession>> {
        self.sessions.remove(session_id).map(|(_, session)| session)
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<LobbySession>> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    /// Find a connected session for a user.
    ///
    /// This is how table formation reaches a user's session to seat it with
    /// `LobbySession::attend`; the gateway itself keys everything by session id.
    pub fn find_by_user(&self, user_id: UserId) -> Option<Arc<LobbySession>> {
        self.sessions
            .iter()
            .find(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_taken_id() {
        let registry = TableRegistry::new();
        assert!(registry.insert(Table::game(1, "first")));
        assert!(!registry.insert(Table::game(1, "second")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(1).unwrap().lock().name, "first");
    }

    #[test]
    fn get_returns_none_for_unknown() {
        let registry = TableRegistry::new();
        assert!(registry.get(99).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn holds_detects_replaced_table() {
        let registry = TableRegistry::new();
        registry.insert(Table::replay(5, "replay"));
        let original = registry.get(5).unwrap();
        assert!(registry.holds(5, &original));

        registry.remove(5);
        assert!(!registry.holds(5, &original));

        registry.insert(Table::replay(5, "another replay"));
        assert!(!registry.holds(5, &original));
    }

    #[test]
    fn holds_while_table_is_locked() {
        let registry = TableRegistry::new();
        registry.insert(Table::game(3, "locked"));
        let table = registry.get(3).unwrap();

        let _guard = table.lock();
        assert!(registry.holds(3, &table));
        assert!(registry.remove(3).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn summaries_are_sorted_by_id() {
        let registry = TableRegistry::new();
        registry.insert(Table::game(9, "nine"));
        registry.insert(Table::replay(2, "two"));
        registry.insert(Table::game(5, "five"));

        let ids: Vec<TableId> = registry.summaries().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn session_register_find_and_remove() {
        let sessions = SessionRegistry::new();
        let (session, _inbox) = LobbySession::new("ses_a".to_string(), 11, "alice".to_string());
        sessions.register(Arc::new(session));

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.find_by_user(11).unwrap().session_id, "ses_a");
        assert!(sessions.find_by_user(12).is_none());
        assert!(sessions.get("ses_a").is_some());

        assert!(sessions.remove("ses_a").is_some());
        assert!(sessions.is_empty());
    }
}
