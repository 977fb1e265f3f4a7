mod comment;
mod like;
mod new;

use axum::{routing::post, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(new::add_post))
        .route("/posts/{post_id}/like", post(like::like_post).delete(like::unlike_post))
        .route("/posts/{post_id}/comments", post(comment::add_comment))
        .route("/posts/{post_id}/comments/{comment_id}/like", post(comment::like_comment))
}
