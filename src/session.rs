use tower_sessions::Session;

use crate::{error::RequestError, graph::SocialGraph, id::Id, models::User, AppResult};

pub const USER_ID: &str = "user_id";

/// The user the session belongs to, if it has one and they still exist.
pub async fn current_user(session: &Session, graph: &SocialGraph) -> AppResult<Option<User>> {
    let Some(user_id) = session.get::<Id>(USER_ID).await? else {
        return Ok(None);
    };
    Ok(graph.user(&user_id).await?)
}

/// Like [`current_user`], but fails with 401 when there is nobody.
pub async fn require_user(session: &Session, graph: &SocialGraph) -> AppResult<User> {
    Ok(current_user(session, graph)
        .await?
        .ok_or(RequestError::Unauthenticated)?)
}
