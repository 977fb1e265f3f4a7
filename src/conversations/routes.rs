use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tower_sessions::Session;

use super::{ChatMessage, Conversation, Conversations};
use crate::{
    error::RequestError,
    graph::SocialGraph,
    id::Id,
    models::{MiniUser, User},
    session::require_user,
    AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", post(add_conversation))
        .route("/conversations/{conversation_id}", get(get_conversation))
        .route("/conversations/{conversation_id}/message", put(add_message))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewConversationBody {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewMessageBody {
    to: String,
    txt: String,
}

/// Loads the conversation, failing unless `user` takes part in it.
async fn member_conversation(conversations: &Conversations, id: &Id, user: &User) -> AppResult<Conversation> {
    let conversation = conversations
        .get(id)
        .await?
        .ok_or(RequestError::NotFound("conversation"))?;
    if !conversation.has_member(&user.username) {
        tracing::warn!(username = %user.username, conversation = %id, "not a member of conversation");
        return Err(RequestError::NotMember.into());
    }
    Ok(conversation)
}

async fn stamp_last_seen(graph: &SocialGraph, user: &User) {
    if let Err(err) = graph.update_last_seen(&user.id, OffsetDateTime::now_utc()).await {
        tracing::warn!(user = %user.username, "could not update last seen: {err}");
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn get_conversation(
    Path(conversation_id): Path<Id>,
    State(graph): State<SocialGraph>,
    State(conversations): State<Conversations>,
    session: Session,
) -> AppResult<Json<Conversation>> {
    let user = require_user(&session, &graph).await?;
    let conversation = member_conversation(&conversations, &conversation_id, &user).await?;
    stamp_last_seen(&graph, &user).await;
    Ok(Json(conversation))
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_conversation(
    State(graph): State<SocialGraph>,
    State(conversations): State<Conversations>,
    session: Session,

    Json(NewConversationBody { from, to }): Json<NewConversationBody>,
) -> AppResult<Json<Conversation>> {
    let user = require_user(&session, &graph).await?;
    if from != user.username && to != user.username {
        return Err(RequestError::NotMember.into());
    }

    let member = async |username: &str| -> AppResult<MiniUser> {
        if username == user.username {
            return Ok(user.mini());
        }
        Ok(graph
            .user_by_username(username)
            .await?
            .ok_or(RequestError::NotFound("user"))?
            .mini())
    };
    let member1 = member(from.as_str()).await?;
    let member2 = member(to.as_str()).await?;

    Ok(Json(conversations.open(member1, member2).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_message(
    Path(conversation_id): Path<Id>,
    State(graph): State<SocialGraph>,
    State(conversations): State<Conversations>,
    session: Session,

    Json(NewMessageBody { to, txt }): Json<NewMessageBody>,
) -> AppResult<Json<ChatMessage>> {
    let user = require_user(&session, &graph).await?;
    let conversation = member_conversation(&conversations, &conversation_id, &user).await?;

    let message = ChatMessage::new(conversation.id, user.username.clone(), to, txt);
    conversations.add_message(&message).await?;
    stamp_last_seen(&graph, &user).await;
    Ok(Json(message))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{http::StatusCode, response::IntoResponse};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::{config::Config, session::USER_ID, store::MemoryDocumentStore};

    fn user(username: &str) -> User {
        User {
            id: Id::new(),
            username: username.to_owned(),
            fullname: String::new(),
            profile_picture: String::new(),
            following: Vec::new(),
            new_notification: None,
            last_seen: None,
            is_admin: false,
        }
    }

    async fn state(users: &[&User]) -> AppState {
        let config = Config {
            database_url: "sqlite::memory:".into(),
            server_ip_port: "127.0.0.1:0".into(),
            allow_origins: String::new(),
            db_max_connections: 1,
            allow_dev_login: false,
        };
        let state = AppState::new(Arc::new(MemoryDocumentStore::new()), config);
        for user in users {
            state.graph.add_user(user).await.unwrap();
        }
        state
    }

    async fn session_of(user: &User) -> Session {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session.insert(USER_ID, user.id).await.unwrap();
        session
    }

    fn status<T>(result: AppResult<T>) -> StatusCode {
        match result {
            Ok(_) => StatusCode::OK,
            Err(err) => err.into_response().status(),
        }
    }

    #[tokio::test]
    async fn test_conversation_is_opened_once_and_kept_private() {
        let (alice, bob, eve) = (user("alice"), user("bob"), user("eve"));
        let state = state(&[&alice, &bob, &eve]).await;

        let body = || {
            Json(NewConversationBody {
                from: "alice".into(),
                to: "bob".into(),
            })
        };
        let Json(opened) = add_conversation(State(state.graph.clone()), State(state.conversations.clone()), session_of(&alice).await, body())
            .await
            .unwrap();
        let Json(again) = add_conversation(State(state.graph.clone()), State(state.conversations.clone()), session_of(&bob).await, body())
            .await
            .unwrap();
        assert_eq!(opened.id, again.id);

        let outsider = add_conversation(State(state.graph.clone()), State(state.conversations.clone()), session_of(&eve).await, body()).await;
        assert_eq!(status(outsider), StatusCode::FORBIDDEN);

        let read = get_conversation(Path(opened.id), State(state.graph.clone()), State(state.conversations.clone()), session_of(&eve).await).await;
        assert_eq!(status(read), StatusCode::FORBIDDEN);

        let Json(message) = add_message(
            Path(opened.id),
            State(state.graph.clone()),
            State(state.conversations.clone()),
            session_of(&bob).await,
            Json(NewMessageBody {
                to: "alice".into(),
                txt: "hey".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(message.from, "bob");

        let Json(read) = get_conversation(Path(opened.id), State(state.graph.clone()), State(state.conversations.clone()), session_of(&alice).await)
            .await
            .unwrap();
        assert_eq!(read.messages, [message]);
        assert!(state.graph.user(&alice.id).await.unwrap().unwrap().last_seen.is_some());
    }

    #[tokio::test]
    async fn test_unknown_member_or_session() {
        let alice = user("alice");
        let state = state(&[&alice]).await;

        let missing = add_conversation(
            State(state.graph.clone()),
            State(state.conversations.clone()),
            session_of(&alice).await,
            Json(NewConversationBody {
                from: "alice".into(),
                to: "ghost".into(),
            }),
        )
        .await;
        assert_eq!(status(missing), StatusCode::NOT_FOUND);

        let anonymous = Session::new(None, Arc::new(MemoryStore::default()), None);
        let read = get_conversation(Path(Id::new()), State(state.graph.clone()), State(state.conversations.clone()), anonymous).await;
        assert_eq!(status(read), StatusCode::UNAUTHORIZED);
    }
}
