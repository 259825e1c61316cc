use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use signage_shared::screen::ScreenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSession {
    pub connection_id: ConnectionId,
    pub screen_id: ScreenId,
    pub identified_at: DateTime<Utc>,
}

/// Live connection -> screen associations.
///
/// Writes are crate-private: only the realtime hub, acting for the
/// connection that owns the entry, registers or drops a session.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: DashMap<ConnectionId, ScreenSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the screen previously claimed by this connection, if any.
    pub(crate) fn register(&self, connection_id: ConnectionId, screen_id: ScreenId) -> Option<ScreenId> {
        self.sessions
            .insert(
                connection_id,
                ScreenSession {
                    connection_id,
                    screen_id,
                    identified_at: Utc::now(),
                },
            )
            .map(|previous| previous.screen_id)
    }

    pub(crate) fn unregister(&self, connection_id: ConnectionId) -> Option<ScreenId> {
        self.sessions
            .remove(&connection_id)
            .map(|(_, session)| session.screen_id)
    }

    pub fn lookup(&self, connection_id: ConnectionId) -> Option<ScreenId> {
        self.sessions
            .get(&connection_id)
            .map(|session| session.screen_id.clone())
    }

    pub fn connections_for(&self, screen_id: &ScreenId) -> Vec<ConnectionId> {
        self.sessions
            .iter()
            .filter(|entry| &entry.screen_id == screen_id)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn is_screen_connected(&self, screen_id: &ScreenId) -> bool {
        self.sessions
            .iter()
            .any(|entry| &entry.screen_id == screen_id)
    }

    pub fn snapshot(&self) -> Vec<ScreenSession> {
        let mut sessions: Vec<ScreenSession> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        sessions.sort_by_key(|s| s.connection_id);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
