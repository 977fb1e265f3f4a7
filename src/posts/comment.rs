use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    content::ContentQuery,
    error::RequestError,
    graph::SocialGraph,
    id::Id,
    models::Comment,
    realtime::{Dispatcher, SOCKET_EMIT_NOTIFICATION_COMMENT_LIKED, SOCKET_EMIT_NOTIFICATION_POST_COMMENT_ADDED},
    session::require_user,
    AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NewCommentBody {
    comment: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_comment(
    Path(post_id): Path<Id>,
    State(graph): State<SocialGraph>,
    State(content): State<ContentQuery>,
    State(dispatcher): State<Dispatcher>,
    session: Session,

    Json(NewCommentBody { comment }): Json<NewCommentBody>,
) -> AppResult<Json<Comment>> {
    let user = require_user(&session, &graph).await?;
    let post = content.get_post(&post_id).await?.ok_or(RequestError::NotFound("post"))?;

    let comment = content
        .add_comment(&post.id, user.mini(), comment, OffsetDateTime::now_utc())
        .await?
        .ok_or(RequestError::NotFound("post"))?;

    dispatcher
        .notify_unless_self(
            SOCKET_EMIT_NOTIFICATION_POST_COMMENT_ADDED,
            serde_json::to_value(post.mini())?,
            &post.creator,
            &user.id,
        )
        .await;

    Ok(Json(comment))
}

#[debug_handler(state = AppState)]
pub(crate) async fn like_comment(
    Path((post_id, comment_id)): Path<(Id, String)>,
    State(graph): State<SocialGraph>,
    State(content): State<ContentQuery>,
    State(dispatcher): State<Dispatcher>,
    session: Session,
) -> AppResult<StatusCode> {
    let user = require_user(&session, &graph).await?;

    let (comment, liked) = content
        .like_comment(&post_id, &comment_id, user.mini(), OffsetDateTime::now_utc())
        .await?
        .ok_or(RequestError::NotFound("comment"))?;

    if liked {
        dispatcher
            .notify_unless_self(
                SOCKET_EMIT_NOTIFICATION_COMMENT_LIKED,
                serde_json::to_value(comment.mini())?,
                &comment.creator,
                &user.id,
            )
            .await;
    }

    Ok(StatusCode::NO_CONTENT)
}
