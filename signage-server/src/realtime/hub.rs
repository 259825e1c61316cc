use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use signage_shared::{realtime::Envelope, screen::ScreenId};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::sessions::{ConnectionId, SessionTable};

/// Open realtime connections and the screens they identified as.
///
/// Each socket task owns one `ConnectionId`; it is the only caller that
/// identifies or closes that id. Pushes are fire-and-forget: a message for a
/// screen with no live connection is dropped.
#[derive(Debug, Default)]
pub struct RealtimeHub {
    next_id: AtomicU64,
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Envelope>>,
    sessions: SessionTable,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Envelope>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(id, tx);
        (id, rx)
    }

    pub(crate) fn identify(&self, connection_id: ConnectionId, screen_id: ScreenId) {
        match self.sessions.register(connection_id, screen_id.clone()) {
            Some(previous) if previous != screen_id => {
                info!(%connection_id, %previous, %screen_id, "connection re-identified")
            }
            Some(_) => {}
            None => info!(%connection_id, %screen_id, "screen identified"),
        }
    }

    pub(crate) fn close(&self, connection_id: ConnectionId) {
        self.peers.remove(&connection_id);
        if let Some(screen_id) = self.sessions.unregister(connection_id) {
            info!(%connection_id, %screen_id, "screen session closed");
        }
    }

    pub fn send_to(&self, connection_id: ConnectionId, envelope: Envelope) -> bool {
        match self.peers.get(&connection_id) {
            Some(peer) => peer.send(envelope).is_ok(),
            None => false,
        }
    }

    /// Returns how many connections accepted the message.
    pub fn push_to_screen(&self, screen_id: &ScreenId, envelope: Envelope) -> usize {
        let delivered = self
            .sessions
            .connections_for(screen_id)
            .into_iter()
            .filter(|conn| self.send_to(*conn, envelope.clone()))
            .count();
        if delivered == 0 {
            debug!(%screen_id, kind = %envelope.kind, "no live session, message dropped");
        }
        delivered
    }

    pub fn broadcast(&self, envelope: Envelope) -> usize {
        let peers: Vec<ConnectionId> = self.peers.iter().map(|entry| *entry.key()).collect();
        peers
            .into_iter()
            .filter(|conn| self.send_to(*conn, envelope.clone()))
            .count()
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }
}
