//! In-memory session state keyed by session id.
//!
//! Each session holds at most one merged table. Only the ingestion page writes
//! it ([`SessionStore::store_merged`] is crate-private); every other page reads.
//! Nothing is persisted; state disappears with the process.

use std::{collections::HashMap, fmt};

use log::debug;
use uuid::Uuid;

use crate::data::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Session {
    merged: Option<Table>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh, empty session and returns its id.
    pub fn open(&mut self) -> SessionId {
        let id = SessionId::new();
        self.sessions.insert(id, Session::default());
        debug!("Opened session {id}");
        id
    }

    /// The last merged table of `id`, if a merge has succeeded.
    pub fn merged(&self, id: SessionId) -> Option<&Table> {
        self.sessions.get(&id).and_then(|s| s.merged.as_ref())
    }

    /// Replaces the merged table of `id`, creating the session when unknown.
    pub(crate) fn store_merged(&mut self, id: SessionId, table: Table) -> &Table {
        let session = self.sessions.entry(id).or_default();
        debug!(
            "Storing merged table in session {id} (replacing previous: {})",
            session.merged.is_some()
        );
        session.merged.insert(table)
    }
}
