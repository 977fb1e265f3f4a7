use std::sync::Arc;

use serde_json::Value;

use super::{ConnectionId, OutboundEvent, PresenceRegistry};
use crate::{error::StoreError, graph::SocialGraph, id::Id, models::MiniUser};

/// Outcome of [`Dispatcher::deliver`]. An offline target is not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the target's live connection. Nothing waits for an ack.
    Sent(ConnectionId),
    /// Written to the target's pending slot, replacing what was there.
    Pending,
}

#[derive(Clone)]
pub struct Dispatcher {
    presence: Arc<PresenceRegistry>,
    graph: SocialGraph,
}

impl Dispatcher {
    pub fn new(presence: Arc<PresenceRegistry>, graph: SocialGraph) -> Self {
        Self { presence, graph }
    }

    /// Pushes the event to `target` if they are connected, else parks it in
    /// their pending slot for the next authentication.
    pub async fn deliver(&self, event_type: &str, payload: Value, target: &MiniUser) -> Result<Delivery, StoreError> {
        let event = OutboundEvent::new(event_type, payload);

        if let Some(connection) = self.presence.find_by_username(&target.username).await {
            if self.presence.send(connection, event.clone()).await {
                tracing::info!(event = event_type, username = %target.username, connection = %connection, "emitting event to user");
                return Ok(Delivery::Sent(connection));
            }
        }

        tracing::info!(event = event_type, username = %target.username, "no active connection, saving pending notification");
        self.graph.set_pending(&target.id, &event.into()).await?;
        Ok(Delivery::Pending)
    }

    /// Delivers an action notification to `target` unless they are the one who
    /// acted. Failures are logged, never returned; the action has already happened.
    pub async fn notify_unless_self(&self, event_type: &str, payload: Value, target: &MiniUser, actor: &Id) -> Option<Delivery> {
        if target.id == *actor {
            return None;
        }
        match self.deliver(event_type, payload, target).await {
            Ok(delivery) => Some(delivery),
            Err(err) => {
                tracing::warn!(event = event_type, username = %target.username, "could not deliver notification: {err}");
                None
            }
        }
    }

    /// Sends to every connection except those bound to `excluded`.
    pub async fn broadcast_except(&self, event_type: &str, payload: Value, excluded: &Id) -> usize {
        let event = OutboundEvent::new(event_type, payload);
        let sent = self
            .presence
            .send_where(|_, entry| entry.is_none_or(|e| e.user_id != *excluded), &event)
            .await;
        tracing::debug!(event = event_type, excluded = %excluded, sent, "broadcast");
        sent
    }

    pub async fn broadcast(&self, event_type: &str, payload: Value) -> usize {
        let event = OutboundEvent::new(event_type, payload);
        let sent = self.presence.send_where(|_, _| true, &event).await;
        tracing::debug!(event = event_type, sent, "broadcast");
        sent
    }
}
