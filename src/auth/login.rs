use std::sync::Arc;

use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    config::Config,
    error::RequestError,
    graph::SocialGraph,
    models::MiniUser,
    session::USER_ID,
    AppResult,
};

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    pub(crate) username: String,
}

/// Starts a session for an existing user by username. Only mounted when
/// `ALLOW_DEV_LOGIN` is on; real sessions come from the account service.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(config): State<Arc<Config>>,
    State(graph): State<SocialGraph>,
    session: Session,
    Json(LoginBody { username }): Json<LoginBody>,
) -> AppResult<Json<MiniUser>> {
    if !config.allow_dev_login {
        return Err(RequestError::DevLoginDisabled.into());
    }

    let user = graph
        .user_by_username(&username)
        .await?
        .ok_or(RequestError::NotFound("user"))?;

    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;
    tracing::info!(username = %user.username, "dev login");

    Ok(Json(user.mini()))
}
