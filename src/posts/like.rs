use axum::{debug_handler, extract::{Path, State}, http::StatusCode};
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    content::ContentQuery,
    error::RequestError,
    graph::SocialGraph,
    id::Id,
    realtime::{Dispatcher, SOCKET_EMIT_NOTIFICATION_POST_LIKED},
    session::require_user,
    AppResult, AppState,
};

#[debug_handler(state = AppState)]
pub(crate) async fn like_post(
    Path(post_id): Path<Id>,
    State(graph): State<SocialGraph>,
    State(content): State<ContentQuery>,
    State(dispatcher): State<Dispatcher>,
    session: Session,
) -> AppResult<StatusCode> {
    let user = require_user(&session, &graph).await?;
    let post = content.get_post(&post_id).await?.ok_or(RequestError::NotFound("post"))?;

    // Repeated likes are no-ops and notify nobody.
    if content.like_post(&post.id, user.mini(), OffsetDateTime::now_utc()).await? {
        dispatcher
            .notify_unless_self(SOCKET_EMIT_NOTIFICATION_POST_LIKED, serde_json::to_value(post.mini())?, &post.creator, &user.id)
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = AppState)]
pub(crate) async fn unlike_post(
    Path(post_id): Path<Id>,
    State(graph): State<SocialGraph>,
    State(content): State<ContentQuery>,
    session: Session,
) -> AppResult<StatusCode> {
    let user = require_user(&session, &graph).await?;
    content.unlike_post(&post_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
