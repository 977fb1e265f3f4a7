mod routes;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    error::StoreError,
    id::{short_id, Id},
    models::{MiniUser, CONVERSATIONS},
    store::{decode, encode, DocumentStore, Filter, Mutation},
};

pub use routes::router;

const MESSAGE_ID_LEN: usize = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: Id,
    pub from: String,
    pub to: String,
    pub txt: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChatMessage {
    /// A message sent now by `from`.
    pub fn new(conversation_id: Id, from: String, to: String, txt: String) -> Self {
        Self {
            id: short_id(MESSAGE_ID_LEN),
            conversation_id,
            from,
            to,
            txt,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Id,
    pub member1: MiniUser,
    pub member2: MiniUser,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn has_member(&self, username: &str) -> bool {
        self.member1.username == username || self.member2.username == username
    }
}

#[derive(Clone)]
pub struct Conversations {
    store: Arc<dyn DocumentStore>,
}

impl Conversations {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, member1: MiniUser, member2: MiniUser) -> Result<Conversation, StoreError> {
        let conversation = Conversation {
            id: Id::new(),
            member1,
            member2,
            messages: Vec::new(),
        };
        self.store
            .insert_one(CONVERSATIONS, encode(CONVERSATIONS, &conversation)?)
            .await?;
        Ok(conversation)
    }

    /// The conversation between the two users, in either member order.
    pub async fn between(&self, a: &str, b: &str) -> Result<Option<Conversation>, StoreError> {
        for (member1, member2) in [(a, b), (b, a)] {
            let filter = Filter::And(vec![
                Filter::eq("member1.username", member1),
                Filter::eq("member2.username", member2),
            ]);
            if let Some(document) = self.store.find_one(CONVERSATIONS, &filter).await? {
                return decode(CONVERSATIONS, document).map(Some);
            }
        }
        Ok(None)
    }

    /// Returns the existing conversation between the two users, or starts one.
    pub async fn open(&self, member1: MiniUser, member2: MiniUser) -> Result<Conversation, StoreError> {
        if let Some(existing) = self.between(&member1.username, &member2.username).await? {
            return Ok(existing);
        }
        let conversation = self.create(member1, member2).await?;
        tracing::info!(conversation = %conversation.id, "conversation started");
        Ok(conversation)
    }

    pub async fn get(&self, id: &Id) -> Result<Option<Conversation>, StoreError> {
        self.store
            .find_one(CONVERSATIONS, &Filter::id(id))
            .await?
            .map(|document| decode(CONVERSATIONS, document))
            .transpose()
    }

    /// Appends to the conversation's history; false if there is no such conversation.
    pub async fn add_message(&self, message: &ChatMessage) -> Result<bool, StoreError> {
        let result = self
            .store
            .update_one(
                CONVERSATIONS,
                &Filter::id(&message.conversation_id),
                &Mutation::push("messages", encode(CONVERSATIONS, message)?),
            )
            .await?;
        Ok(result.matched > 0)
    }
}
