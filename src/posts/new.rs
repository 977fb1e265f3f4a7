use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    content::ContentQuery,
    graph::SocialGraph,
    models::{Media, Post},
    realtime::{Dispatcher, SOCKET_EMIT_NOTIFICATION_POST_ADDED},
    session::require_user,
    AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NewPostBody {
    #[serde(default)]
    media: Vec<Media>,
    #[serde(default)]
    text: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_post(
    State(graph): State<SocialGraph>,
    State(content): State<ContentQuery>,
    State(dispatcher): State<Dispatcher>,
    session: Session,

    Json(NewPostBody { media, text }): Json<NewPostBody>,
) -> AppResult<Json<Post>> {
    let user = require_user(&session, &graph).await?;
    let post = content.add_post(user.mini(), media, text).await?;
    tracing::info!(post = %post.id, username = %user.username, "post added");

    let payload = serde_json::to_value(post.mini())?;
    for follower in graph.followers_of(&user.id).await? {
        dispatcher
            .notify_unless_self(SOCKET_EMIT_NOTIFICATION_POST_ADDED, payload.clone(), &follower, &user.id)
            .await;
    }

    Ok(Json(post))
}
