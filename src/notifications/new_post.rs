use crate::models::Post;

use super::{push_distinct, NotificationEvent, NotificationKind};

/// A single notification fronted by the newest of `posts`, listing every
/// distinct author among them. `None` when there are no posts.
pub fn new_post_notification(posts: &[Post]) -> Option<NotificationEvent> {
    let latest = posts.iter().max_by_key(|post| post.id)?;

    let mut posted_by = Vec::new();
    for post in posts {
        push_distinct(&mut posted_by, &post.creator.username);
    }

    Some(NotificationEvent {
        notify_at: latest.id.created_at(),
        kind: NotificationKind::NewPost {
            post_id: latest.id,
            username: latest.creator.username.clone(),
            profile_picture: latest.creator.profile_picture.clone(),
            media: latest.media.first().cloned(),
            posted_by,
        },
    })
}
