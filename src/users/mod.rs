use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_sessions::Session;

use crate::{
    error::RequestError,
    graph::SocialGraph,
    id::Id,
    realtime::{ActiveConnection, PresenceRegistry},
    session::require_user,
    AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/online", get(online))
        .route("/users/{user_id}/follow", post(follow).delete(unfollow))
}

#[debug_handler(state = AppState)]
async fn follow(
    Path(target_id): Path<Id>,
    State(graph): State<SocialGraph>,
    session: Session,
) -> AppResult<StatusCode> {
    let user = require_user(&session, &graph).await?;
    let target = graph.user(&target_id).await?.ok_or(RequestError::NotFound("user"))?;

    if graph.follow(&user.id, &target.mini()).await? {
        tracing::info!(username = %user.username, target = %target.username, "followed");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = AppState)]
async fn unfollow(
    Path(target_id): Path<Id>,
    State(graph): State<SocialGraph>,
    session: Session,
) -> AppResult<StatusCode> {
    let user = require_user(&session, &graph).await?;
    graph.unfollow(&user.id, &target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = AppState)]
async fn online(
    State(graph): State<SocialGraph>,
    State(presence): State<Arc<PresenceRegistry>>,
    session: Session,
) -> AppResult<Json<Vec<ActiveConnection>>> {
    require_user(&session, &graph).await?;
    Ok(Json(presence.list_active().await))
}
