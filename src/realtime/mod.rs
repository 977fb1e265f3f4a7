//! Real-time delivery: who is connected, and how events reach them.

mod dispatch;
mod msg;
mod presence;
mod ws;

use std::fmt;

use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use dispatch::{Delivery, Dispatcher};
pub use msg::{relay_private_message, ClientMessage, PrivateMessage};
pub use presence::{ActiveConnection, EventSender, PresenceEntry, PresenceRegistry};

use crate::{models::PendingNotification, AppState};

// client -> server
pub const SOCKET_AUTH_EVENT_LOGIN: &str = "set-user-socket";
pub const SOCKET_AUTH_EVENT_LOGOUT: &str = "unset-user-socket";

// both ways
pub const SOCKET_CHAT_NEW_PRIVATE_MESSAGE: &str = "chat-new-private-message";

// server -> client
pub const SOCKET_CHAT_SET_ONLINE: &str = "chat-set-online";
pub const SOCKET_EMIT_NOTIFICATION_POST_LIKED: &str = "notification-post-liked";
pub const SOCKET_EMIT_NOTIFICATION_POST_COMMENT_ADDED: &str = "notification-post-comment-added";
pub const SOCKET_EMIT_NOTIFICATION_COMMENT_LIKED: &str = "notification-comment-liked";
pub const SOCKET_EMIT_NOTIFICATION_POST_ADDED: &str = "notification-post-added";

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws::realtime_ws))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Frame sent to a client: `{"type": ..., "data": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl OutboundEvent {
    pub fn new(event_type: &str, data: Value) -> Self {
        Self {
            event_type: event_type.to_owned(),
            data,
        }
    }
}

impl From<PendingNotification> for OutboundEvent {
    fn from(value: PendingNotification) -> Self {
        Self {
            event_type: value.event_type,
            data: value.data,
        }
    }
}

impl From<OutboundEvent> for PendingNotification {
    fn from(value: OutboundEvent) -> Self {
        Self {
            event_type: value.event_type,
            data: value.data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresenceChanged<'a> {
    pub notification: bool,
    pub username: &'a str,
    pub is_online: bool,
}
