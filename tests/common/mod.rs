#![allow(dead_code)]

use std::sync::Arc;

use nudge::{
    config::Config,
    id::Id,
    models::{MiniUser, User},
    store::{DocumentStore, MemoryDocumentStore},
    AppState,
};
use time::OffsetDateTime;

pub fn user(username: &str) -> User {
    user_created_at(username, OffsetDateTime::now_utc())
}

pub fn user_created_at(username: &str, at: OffsetDateTime) -> User {
    User {
        id: Id::at(at),
        username: username.to_owned(),
        fullname: username.to_uppercase(),
        profile_picture: format!("{username}.jpg"),
        following: Vec::new(),
        new_notification: None,
        last_seen: None,
        is_admin: false,
    }
}

pub fn following(mut user: User, followees: &[&User]) -> User {
    user.following = followees.iter().map(|f| f.mini()).collect::<Vec<MiniUser>>();
    user
}

pub fn config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        server_ip_port: "127.0.0.1:0".into(),
        allow_origins: "http://localhost:5173".into(),
        db_max_connections: 1,
        allow_dev_login: true,
    }
}

pub async fn state_with(users: &[&User]) -> AppState {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let state = AppState::new(store, config());
    for user in users {
        state.graph.add_user(user).await.unwrap();
    }
    state
}
