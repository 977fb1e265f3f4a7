use serde::Deserialize;
use serde_json::Value;

use super::{
    OutboundEvent, PresenceEntry, PresenceRegistry, SOCKET_AUTH_EVENT_LOGIN, SOCKET_AUTH_EVENT_LOGOUT,
    SOCKET_CHAT_NEW_PRIVATE_MESSAGE,
};
use crate::{
    conversations::{ChatMessage, Conversations},
    error::StoreError,
    id::Id,
    models::CONVERSATIONS,
    store::encode,
};

/// Frames a client may send. Whatever `data` accompanies the auth events is
/// ignored; the connection is bound to the session's user.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(try_from = "Frame")]
pub enum ClientMessage {
    SetUserSocket,
    UnsetUserSocket,
    PrivateMessage(PrivateMessage),
}

#[derive(Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

impl TryFrom<Frame> for ClientMessage {
    type Error = String;

    fn try_from(Frame { event_type, data }: Frame) -> Result<Self, Self::Error> {
        match event_type.as_str() {
            SOCKET_AUTH_EVENT_LOGIN => Ok(Self::SetUserSocket),
            SOCKET_AUTH_EVENT_LOGOUT => Ok(Self::UnsetUserSocket),
            SOCKET_CHAT_NEW_PRIVATE_MESSAGE => serde_json::from_value(data)
                .map(Self::PrivateMessage)
                .map_err(|err| err.to_string()),
            other => Err(format!("unknown event type `{other}`")),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    pub conversation_id: Id,
    /// Recipient username.
    pub to: String,
    pub txt: String,
}

/// Forwards a chat message to the recipient if they are connected, then
/// appends it to the conversation. The sender is whoever `from` is bound to,
/// never what the client claims.
pub async fn relay_private_message(
    presence: &PresenceRegistry,
    conversations: &Conversations,
    from: &PresenceEntry,
    PrivateMessage { conversation_id, to, txt }: PrivateMessage,
) -> Result<ChatMessage, StoreError> {
    let message = ChatMessage::new(conversation_id, from.username.clone(), to, txt);

    if let Some(connection) = presence.find_by_username(&message.to).await {
        let event = OutboundEvent::new(SOCKET_CHAT_NEW_PRIVATE_MESSAGE, encode(CONVERSATIONS, &message)?);
        presence.send(connection, event).await;
    }

    if !conversations.add_message(&message).await? {
        tracing::warn!(conversation = %message.conversation_id, "cannot add message to missing conversation");
    }

    Ok(message)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_client_message_representation() {
        let login: ClientMessage = serde_json::from_value(json!({ "type": "set-user-socket" })).unwrap();
        assert_eq!(login, ClientMessage::SetUserSocket);
        let login: ClientMessage =
            serde_json::from_value(json!({ "type": "set-user-socket", "data": "someone-else" })).unwrap();
        assert_eq!(login, ClientMessage::SetUserSocket);

        let id = Id::new();
        let chat: ClientMessage = serde_json::from_value(json!({
            "type": "chat-new-private-message",
            "data": { "conversationId": id, "to": "mago", "txt": "hey" }
        }))
        .unwrap();
        assert_eq!(
            chat,
            ClientMessage::PrivateMessage(PrivateMessage {
                conversation_id: id,
                to: "mago".into(),
                txt: "hey".into(),
            })
        );

        assert!(serde_json::from_value::<ClientMessage>(json!({ "type": "nope" })).is_err());
        assert!(serde_json::from_value::<ClientMessage>(json!({ "type": "chat-new-private-message" })).is_err());
    }
}
