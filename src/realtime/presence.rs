use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

use super::{ConnectionId, OutboundEvent, PresenceChanged, SOCKET_CHAT_SET_ONLINE};
use crate::{error::StoreError, graph::SocialGraph, id::Id, models::User};

pub type EventSender = mpsc::UnboundedSender<OutboundEvent>;

/// Who is behind an authenticated connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: Id,
    pub username: String,
    pub fullname: String,
}

impl From<&User> for PresenceEntry {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConnection {
    pub connection_id: ConnectionId,
    #[serde(flatten)]
    pub entry: PresenceEntry,
}

struct Connection {
    sender: EventSender,
    entry: Option<PresenceEntry>,
}

/// Process-wide registry of open connections.
///
/// Nothing here is persisted; the registry only knows about connections made
/// to this process. Entries change only on connect, authenticate, logout and
/// disconnect.
pub struct PresenceRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    graph: SocialGraph,
}

impl PresenceRegistry {
    pub fn new(graph: SocialGraph) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            graph,
        }
    }

    pub async fn on_connect(&self, sender: EventSender) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections
            .write()
            .await
            .insert(id, Connection { sender, entry: None });
        tracing::info!(connection = %id, "new connection");
        id
    }

    /// Binds `user` to the connection, tells every other connection the user
    /// is online, then hands over the user's pending notification, if any.
    ///
    /// Returns false if the connection is gone.
    pub async fn on_authenticate(&self, connection: ConnectionId, user: &User) -> Result<bool, StoreError> {
        {
            let mut connections = self.connections.write().await;
            let Some(conn) = connections.get_mut(&connection) else {
                return Ok(false);
            };
            conn.entry = Some(user.into());
        }
        tracing::info!(connection = %connection, username = %user.username, "connection authenticated");

        self.broadcast_presence(connection, &user.username, true).await;

        if let Some(pending) = self.graph.take_pending(&user.id).await? {
            let event = OutboundEvent::from(pending);
            tracing::info!(username = %user.username, event = %event.event_type, "delivering pending notification");
            if !self.send(connection, event.clone()).await {
                self.graph.set_pending(&user.id, &event.into()).await?;
            }
        }

        Ok(true)
    }

    /// Explicit logout: everyone else sees the user go offline and the
    /// connection stays open but anonymous.
    pub async fn on_logout(&self, connection: ConnectionId) -> Option<PresenceEntry> {
        let entry = {
            let mut connections = self.connections.write().await;
            connections.get_mut(&connection)?.entry.take()?
        };
        tracing::info!(connection = %connection, username = %entry.username, "connection logged out");
        self.broadcast_presence(connection, &entry.username, false).await;
        Some(entry)
    }

    /// Logs out every connection bound to `user`. Returns how many there were.
    pub async fn logout_user(&self, user: &Id) -> usize {
        let bound: Vec<ConnectionId> = self
            .connections
            .read()
            .await
            .iter()
            .filter(|(_, conn)| conn.entry.as_ref().is_some_and(|entry| entry.user_id == *user))
            .map(|(id, _)| *id)
            .collect();

        let mut logged_out = 0;
        for connection in bound {
            if self.on_logout(connection).await.is_some() {
                logged_out += 1;
            }
        }
        logged_out
    }

    /// Forgets the connection. No offline broadcast is sent.
    pub async fn on_disconnect(&self, connection: ConnectionId) -> Option<PresenceEntry> {
        let removed = self.connections.write().await.remove(&connection)?;
        tracing::info!(connection = %connection, "connection closed");
        removed.entry
    }

    pub async fn entry(&self, connection: ConnectionId) -> Option<PresenceEntry> {
        self.connections
            .read()
            .await
            .get(&connection)
            .and_then(|conn| conn.entry.clone())
    }

    /// Authenticated connections.
    pub async fn list_active(&self) -> Vec<ActiveConnection> {
        self.connections
            .read()
            .await
            .iter()
            .filter_map(|(id, conn)| {
                conn.entry.clone().map(|entry| ActiveConnection {
                    connection_id: *id,
                    entry,
                })
            })
            .collect()
    }

    pub async fn find_by_username(&self, username: &str) -> Option<ConnectionId> {
        self.connections
            .read()
            .await
            .iter()
            .find(|(_, conn)| conn.entry.as_ref().is_some_and(|e| e.username == username))
            .map(|(id, _)| *id)
    }

    /// Queues `event` on the connection. False if it is gone or its writer has stopped.
    pub async fn send(&self, connection: ConnectionId, event: OutboundEvent) -> bool {
        self.connections
            .read()
            .await
            .get(&connection)
            .is_some_and(|conn| conn.sender.send(event).is_ok())
    }

    /// Sends to every connection accepted by `keep`; returns how many were queued.
    pub(crate) async fn send_where(
        &self,
        keep: impl Fn(&ConnectionId, Option<&PresenceEntry>) -> bool,
        event: &OutboundEvent,
    ) -> usize {
        self.connections
            .read()
            .await
            .iter()
            .filter(|(id, conn)| keep(id, conn.entry.as_ref()))
            .filter(|(_, conn)| conn.sender.send(event.clone()).is_ok())
            .count()
    }

    async fn broadcast_presence(&self, origin: ConnectionId, username: &str, is_online: bool) {
        let changed = PresenceChanged {
            notification: true,
            username,
            is_online,
        };
        let Ok(data) = serde_json::to_value(&changed) else {
            return;
        };
        let event = OutboundEvent::new(SOCKET_CHAT_SET_ONLINE, data);
        self.send_where(|id, _| *id != origin, &event).await;
    }
}
