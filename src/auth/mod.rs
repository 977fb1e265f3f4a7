mod login;
mod logout;

use axum::{routing::post, Router};

use login::login;
use logout::logout;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}
