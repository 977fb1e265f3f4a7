use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode};
use tower_sessions::Session;

use crate::{id::Id, realtime::PresenceRegistry, session::USER_ID, AppResult, AppState};

/// Ends the session and logs out every socket the user had authenticated.
#[debug_handler(state = AppState)]
pub(crate) async fn logout(State(presence): State<Arc<PresenceRegistry>>, session: Session) -> AppResult<StatusCode> {
    if let Some(user) = session.get::<Id>(USER_ID).await? {
        presence.logout_user(&user).await;
    }
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}
