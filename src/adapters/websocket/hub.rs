//! Realtime hub: routes server events to live client connections.
//!
//! Rooms are keyed by [`ClientRef`]. A connection is registered in the room
//! of every reference its principal can be addressed by, so an event sent
//! to either the client id or the client document reaches it.
//!
//! ```text
//! Room: id:c-1             Room: document:900
//! ├── conn-a               ├── conn-a
//! └── conn-b               └── conn-b
//! ```
//!
//! Delivery is best effort. Each connection has a bounded outbound buffer;
//! a connection whose buffer is full misses the event. Nothing is queued
//! for offline clients beyond the snapshot sent on connect.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::{ClientPrincipal, ClientRef, ConnectionId, Timestamp};
use crate::domain::notification::NotificationRecord;
use crate::ports::{NotificationRepository, RealtimeNotifier};

use super::messages::{
    now_rfc3339, ConnectedMessage, ConnectionStatusMessage, PendingNotificationsMessage,
    ServerMessage,
};

struct Connection {
    refs: Vec<ClientRef>,
    connected_at: Timestamp,
}

/// Connection and room counts, for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connections: usize,
    pub rooms: usize,
}

pub struct RealtimeHub {
    /// Room → live connections in it.
    rooms: RwLock<HashMap<ClientRef, HashMap<ConnectionId, mpsc::Sender<ServerMessage>>>>,

    /// Connection → rooms it was registered in, for cleanup on disconnect.
    connections: RwLock<HashMap<ConnectionId, Connection>>,

    notifications: Arc<dyn NotificationRepository>,
    snapshot_size: usize,
    connection_buffer: usize,
}

impl RealtimeHub {
    /// Creates a hub.
    ///
    /// * `snapshot_size` - notifications pushed as `pending_notifications`
    ///   on connect
    /// * `connection_buffer` - outbound messages buffered per connection
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        snapshot_size: usize,
        connection_buffer: usize,
    ) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            notifications,
            snapshot_size,
            connection_buffer: connection_buffer.max(2),
        }
    }

    /// Registers a connection for `principal` and returns the receiving end
    /// of its outbound channel, primed with `connected` and the
    /// `pending_notifications` snapshot.
    pub async fn connect(
        &self,
        principal: &ClientPrincipal,
    ) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let connection_id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.connection_buffer);
        let refs = principal.refs();

        // Primed before registration so the snapshot precedes live events.
        let _ = tx.try_send(ServerMessage::Connected(ConnectedMessage {
            connection_id,
            client_id: principal.client_id.to_string(),
            timestamp: now_rfc3339(),
        }));
        let snapshot = self.snapshot_for(&refs).await;
        let _ = tx.try_send(ServerMessage::PendingNotifications(
            PendingNotificationsMessage {
                notifications: snapshot,
            },
        ));

        {
            let mut rooms = self.rooms.write().await;
            for client_ref in &refs {
                rooms
                    .entry(client_ref.clone())
                    .or_default()
                    .insert(connection_id, tx.clone());
            }
        }
        self.connections.write().await.insert(
            connection_id,
            Connection {
                refs: refs.clone(),
                connected_at: Timestamp::now(),
            },
        );

        tracing::info!(
            connection_id = %connection_id,
            client_id = %principal.client_id,
            rooms = refs.len(),
            "realtime client connected"
        );
        (connection_id, rx)
    }

    async fn snapshot_for(&self, refs: &[ClientRef]) -> Vec<NotificationRecord> {
        if self.snapshot_size == 0 {
            return Vec::new();
        }
        match self.notifications.recent_for(refs, self.snapshot_size).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "could not load notification snapshot");
                Vec::new()
            }
        }
    }

    /// Removes the connection from every room. Empty rooms are dropped.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let Some(connection) = self.connections.write().await.remove(connection_id) else {
            return;
        };

        let mut rooms = self.rooms.write().await;
        for client_ref in &connection.refs {
            if let Some(room) = rooms.get_mut(client_ref) {
                room.remove(connection_id);
                if room.is_empty() {
                    rooms.remove(client_ref);
                }
            }
        }
        tracing::info!(connection_id = %connection_id, "realtime client disconnected");
    }

    /// Status of one connection, if it is still registered.
    pub async fn connection_status(&self, connection_id: &ConnectionId) -> Option<ServerMessage> {
        let connections = self.connections.read().await;
        connections.get(connection_id).map(|c| {
            ServerMessage::ConnectionStatus(ConnectionStatusMessage {
                connection_id: *connection_id,
                connected_at: c.connected_at.as_datetime().to_rfc3339(),
                rooms: c.refs.clone(),
            })
        })
    }

    /// Number of live connections in the room of `client`.
    pub async fn connection_count(&self, client: &ClientRef) -> usize {
        self.rooms
            .read()
            .await
            .get(client)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub async fn stats(&self) -> HubStats {
        HubStats {
            connections: self.connections.read().await.len(),
            rooms: self.rooms.read().await.len(),
        }
    }
}

#[async_trait]
impl RealtimeNotifier for RealtimeHub {
    async fn emit_to_client(&self, client: &ClientRef, event: &str, payload: JsonValue) -> bool {
        // Senders are cloned out so no lock is held while sending.
        let targets: Vec<(ConnectionId, mpsc::Sender<ServerMessage>)> = {
            let rooms = self.rooms.read().await;
            match rooms.get(client) {
                Some(room) => room.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
                None => return false,
            }
        };

        let message = ServerMessage::event(event, payload);
        let mut accepted = 0usize;
        for (connection_id, tx) in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => accepted += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %connection_id, event, "connection buffer full; event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %connection_id, "connection already closed");
                }
            }
        }

        tracing::debug!(client = %client, event, accepted, "realtime emit");
        accepted > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryNotificationRepository;
    use crate::domain::foundation::{ClientId, SampleId, UserId};
    use crate::domain::sample::{Actor, SampleState, SampleStateChanged};
    use serde_json::json;

    fn principal(id: &str, document: Option<&str>) -> ClientPrincipal {
        ClientPrincipal {
            client_id: ClientId::new(id).unwrap(),
            document: document.map(String::from),
        }
    }

    fn hub() -> (RealtimeHub, Arc<InMemoryNotificationRepository>) {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        (RealtimeHub::new(repo.clone(), 2, 8), repo)
    }

    fn record_for(client: ClientRef) -> NotificationRecord {
        NotificationRecord::for_state_change(&SampleStateChanged {
            sample_id: SampleId::new("S-1").unwrap(),
            client: client.clone(),
            client_refs: vec![client],
            previous_state: SampleState::Received,
            new_state: SampleState::InAnalysis,
            observations: String::new(),
            actor: Actor {
                id: UserId::new("lab-1").unwrap(),
                name: "Ana".into(),
                document: None,
            },
            occurred_at: Timestamp::now(),
        })
    }

    async fn drain_greeting(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<NotificationRecord> {
        assert!(matches!(rx.recv().await, Some(ServerMessage::Connected(_))));
        match rx.recv().await {
            Some(ServerMessage::PendingNotifications(p)) => p.notifications,
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn emit_without_connections_returns_false() {
        let (hub, _) = hub();
        let delivered = hub
            .emit_to_client(&ClientRef::ById(ClientId::new("c-1").unwrap()), "notification", json!({}))
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn connection_is_reachable_by_id_and_document() {
        let (hub, _) = hub();
        let (_, mut rx) = hub.connect(&principal("c-1", Some("900"))).await;
        drain_greeting(&mut rx).await;

        assert!(
            hub.emit_to_client(&ClientRef::ByDocument("900".into()), "notification", json!({"n": 1}))
                .await
        );
        assert!(
            hub.emit_to_client(&ClientRef::ById(ClientId::new("c-1").unwrap()), "notification", json!({"n": 2}))
                .await
        );

        for expected in [1, 2] {
            match rx.recv().await {
                Some(ServerMessage::Event(e)) => {
                    assert_eq!(e.event, "notification");
                    assert_eq!(e.data["n"], expected);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn every_connection_of_a_client_receives_the_event() {
        let (hub, _) = hub();
        let owner = principal("c-1", None);
        let (_, mut phone) = hub.connect(&owner).await;
        let (_, mut laptop) = hub.connect(&owner).await;
        drain_greeting(&mut phone).await;
        drain_greeting(&mut laptop).await;

        assert!(hub.emit_to_client(&owner.refs()[0], "notification", json!({})).await);
        assert!(matches!(phone.recv().await, Some(ServerMessage::Event(_))));
        assert!(matches!(laptop.recv().await, Some(ServerMessage::Event(_))));
    }

    #[tokio::test]
    async fn snapshot_is_bounded_and_scoped_to_client() {
        let (hub, repo) = hub();
        let mine = ClientRef::ById(ClientId::new("c-1").unwrap());
        for _ in 0..3 {
            repo.save(&record_for(mine.clone())).await.unwrap();
        }
        repo.save(&record_for(ClientRef::ById(ClientId::new("c-2").unwrap())))
            .await
            .unwrap();

        let (_, mut rx) = hub.connect(&principal("c-1", None)).await;
        let snapshot = drain_greeting(&mut rx).await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|r| r.client == mine));
    }

    #[tokio::test]
    async fn disconnect_removes_all_rooms() {
        let (hub, _) = hub();
        let (id, _rx) = hub.connect(&principal("c-1", Some("900"))).await;
        assert_eq!(hub.stats().await, HubStats { connections: 1, rooms: 2 });
        assert_eq!(hub.connection_count(&ClientRef::ByDocument("900".into())).await, 1);

        hub.disconnect(&id).await;
        assert_eq!(hub.stats().await, HubStats { connections: 0, rooms: 0 });
        assert_eq!(hub.connection_count(&ClientRef::ByDocument("900".into())).await, 0);
        assert!(hub.connection_status(&id).await.is_none());
    }

    #[tokio::test]
    async fn closed_receiver_does_not_count_as_delivered() {
        let (hub, _) = hub();
        let owner = principal("c-1", None);
        let (_, rx) = hub.connect(&owner).await;
        drop(rx);

        assert!(!hub.emit_to_client(&owner.refs()[0], "notification", json!({})).await);
    }

    #[tokio::test]
    async fn full_buffer_drops_event() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let hub = RealtimeHub::new(repo, 0, 2);
        let owner = principal("c-1", None);
        // Connected + snapshot already fill the buffer.
        let (_, _rx) = hub.connect(&owner).await;

        assert!(!hub.emit_to_client(&owner.refs()[0], "notification", json!({})).await);
    }
}
