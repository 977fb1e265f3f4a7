use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tower_sessions::Session;

use super::{relay_private_message, ClientMessage, ConnectionId, OutboundEvent, PresenceRegistry};
use crate::{conversations::Conversations, graph::SocialGraph, id::Id, session::USER_ID, AppResult, AppState};

#[debug_handler(state = AppState)]
pub async fn realtime_ws(
    State(presence): State<Arc<PresenceRegistry>>,
    State(graph): State<SocialGraph>,
    State(conversations): State<Conversations>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    // Anonymous sockets are allowed; they just cannot authenticate.
    let session_user = session.get::<Id>(USER_ID).await?;

    Ok(ws.on_upgrade(move |stream| run_socket(stream, session_user, presence, graph, conversations)))
}

async fn run_socket(
    stream: WebSocket,
    session_user: Option<Id>,
    presence: Arc<PresenceRegistry>,
    graph: SocialGraph,
    conversations: Conversations,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();
    let connection = presence.on_connect(tx).await;
    let (mut sender, mut receiver) = stream.split();

    let mut forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = {
        let presence = presence.clone();
        let graph = graph.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                let msg = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let Ok(msg) = serde_json::from_str::<ClientMessage>(msg.as_str()) else {
                    tracing::debug!(connection = %connection, "ignoring unrecognized frame");
                    continue;
                };

                handle_client_message(connection, session_user, msg, &presence, &graph, &conversations).await;
            }
        })
    };

    tokio::select! {
        _ = &mut forward_task => recv_task.abort(),
        _ = &mut recv_task => forward_task.abort(),
    };

    if let Some(entry) = presence.on_disconnect(connection).await {
        if let Err(err) = graph.update_last_seen(&entry.user_id, OffsetDateTime::now_utc()).await {
            tracing::warn!(username = %entry.username, "could not update last seen: {err}");
        }
    }
}

async fn handle_client_message(
    connection: ConnectionId,
    session_user: Option<Id>,
    msg: ClientMessage,
    presence: &PresenceRegistry,
    graph: &SocialGraph,
    conversations: &Conversations,
) {
    match msg {
        ClientMessage::SetUserSocket => {
            let Some(user_id) = session_user else {
                tracing::debug!(connection = %connection, "cannot authenticate without a session");
                return;
            };
            let user = match graph.user(&user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => return,
                Err(err) => {
                    tracing::warn!(connection = %connection, "could not load user: {err}");
                    return;
                }
            };
            if let Err(err) = presence.on_authenticate(connection, &user).await {
                tracing::warn!(connection = %connection, "could not hand over pending notification: {err}");
            }
        }
        ClientMessage::UnsetUserSocket => {
            presence.on_logout(connection).await;
        }
        ClientMessage::PrivateMessage(message) => {
            let Some(from) = presence.entry(connection).await else {
                tracing::debug!(connection = %connection, "dropping chat message from anonymous connection");
                return;
            };
            if let Err(err) = relay_private_message(presence, conversations, &from, message).await {
                tracing::warn!(connection = %connection, "could not save chat message: {err}");
            }
        }
    }
}
