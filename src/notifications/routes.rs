use axum::{debug_handler, extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tower_sessions::Session;

use super::{Aggregator, NotificationEvent};
use crate::{graph::SocialGraph, session::require_user, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(notifications))
}

#[debug_handler(state = AppState)]
async fn notifications(
    State(graph): State<SocialGraph>,
    State(aggregator): State<Aggregator>,
    session: Session,
) -> AppResult<Json<Vec<NotificationEvent>>> {
    let user = require_user(&session, &graph).await?;

    let feed = aggregator.get_notifications(&user).await?;

    if let Err(err) = graph.update_last_seen(&user.id, OffsetDateTime::now_utc()).await {
        tracing::warn!(user = %user.username, "could not update last seen: {err}");
    }

    Ok(Json(feed))
}
