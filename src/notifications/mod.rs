//! Pull-model notification feed.
//!
//! Four generators (follow, new post, post liked, post commented) run over the
//! social graph and the content store. Their outputs are concatenated, ranked
//! by `notifyAt` and capped at [`MAX_NOTIFICATIONS`].

mod engagement;
mod follow;
mod new_post;
mod routes;

use serde::Serialize;
use time::OffsetDateTime;

pub use engagement::{post_comment_notifications, post_like_notifications};
pub use follow::follow_notifications;
pub use new_post::new_post_notification;
pub use routes::router;

use crate::{
    content::{ContentQuery, TRAILING_WINDOW},
    error::NotifyError,
    graph::SocialGraph,
    id::Id,
    models::{Media, MiniUser, User},
};

pub const MAX_NOTIFICATIONS: usize = 12;

const PREVIEW_CHARS: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(flatten)]
    pub kind: NotificationKind,
    #[serde(with = "time::serde::rfc3339")]
    pub notify_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    /// `user` was followed by each of `followed_by`.
    #[serde(rename_all = "camelCase")]
    Follow {
        #[serde(flatten)]
        user: MiniUser,
        followed_by: Vec<String>,
    },
    /// Fronted by the newest post; `posted_by` lists every recent author.
    #[serde(rename_all = "camelCase")]
    NewPost {
        post_id: Id,
        username: String,
        profile_picture: String,
        media: Option<Media>,
        posted_by: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    PostLike {
        post_id: Id,
        username: String,
        profile_picture: String,
        media: Option<Media>,
        text: String,
        likes: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    PostComment {
        post_id: Id,
        username: String,
        profile_picture: String,
        media: Option<Media>,
        text: String,
        comments: Vec<String>,
    },
}

/// Sorts newest first. The sort is stable: equal `notifyAt` keep their input order.
pub(crate) fn rank(notifications: &mut [NotificationEvent]) {
    notifications.sort_by(|a, b| b.notify_at.cmp(&a.notify_at));
}

/// Concatenates generator outputs in order, ranks them and keeps the first `cap`.
pub fn merge_and_rank(
    groups: impl IntoIterator<Item = Vec<NotificationEvent>>,
    cap: usize,
) -> Vec<NotificationEvent> {
    let mut notifications: Vec<_> = groups.into_iter().flatten().collect();
    rank(&mut notifications);
    notifications.truncate(cap);
    notifications
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Pushes `username` unless already present, keeping first-seen order.
fn push_distinct(names: &mut Vec<String>, username: &str) {
    if !names.iter().any(|n| n == username) {
        names.push(username.to_owned());
    }
}

#[derive(Clone)]
pub struct Aggregator {
    graph: SocialGraph,
    content: ContentQuery,
}

impl Aggregator {
    pub fn new(graph: SocialGraph, content: ContentQuery) -> Self {
        Self { graph, content }
    }

    pub async fn get_notifications(&self, user: &User) -> Result<Vec<NotificationEvent>, NotifyError> {
        self.get_notifications_at(user, OffsetDateTime::now_utc()).await
    }

    /// Builds the feed as of `now`. Any failing generator fails the whole feed.
    pub async fn get_notifications_at(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> Result<Vec<NotificationEvent>, NotifyError> {
        let since = now - TRAILING_WINDOW;

        let engaged = self
            .content
            .query_own_posts_with_recent_engagement(user, now)
            .await
            .map_err(NotifyError::in_generator("engagement"))?;

        let follows = self.follow_notifications(user).await?;

        let recent = self
            .content
            .query_recent_followed_posts(user, since)
            .await
            .map_err(NotifyError::in_generator("new_post"))?;
        let new_posts: Vec<_> = new_post_notification(&recent).into_iter().collect();

        let likes = post_like_notifications(user, &engaged.liked_posts, since);
        let comments = post_comment_notifications(user, &engaged.commented_posts, since);

        let feed = merge_and_rank([follows, new_posts, likes, comments], MAX_NOTIFICATIONS);
        tracing::debug!(user = %user.username, count = feed.len(), "built notification feed");
        Ok(feed)
    }

    pub async fn follow_notifications(&self, user: &User) -> Result<Vec<NotificationEvent>, NotifyError> {
        let users = self
            .graph
            .all_users()
            .await
            .map_err(NotifyError::in_generator("follow"))?;
        Ok(follow_notifications(user, &users))
    }
}

#[cfg(test)]
mod test {
    use time::Duration;

    use super::*;

    fn follow_at(username: &str, at: OffsetDateTime) -> NotificationEvent {
        NotificationEvent {
            kind: NotificationKind::Follow {
                user: MiniUser {
                    id: Id::at(at),
                    username: username.to_owned(),
                    profile_picture: String::new(),
                },
                followed_by: vec!["someone".to_owned()],
            },
            notify_at: at,
        }
    }

    fn username(event: &NotificationEvent) -> &str {
        match &event.kind {
            NotificationKind::Follow { user, .. } => &user.username,
            NotificationKind::NewPost { username, .. }
            | NotificationKind::PostLike { username, .. }
            | NotificationKind::PostComment { username, .. } => username,
        }
    }

    #[test]
    fn test_merge_sorts_descending_and_caps() {
        let now = OffsetDateTime::now_utc();
        let group = |offset: i64| -> Vec<NotificationEvent> {
            (0..5)
                .map(|i| follow_at(&format!("u{offset}-{i}"), now - Duration::hours(offset + i * 3)))
                .collect()
        };

        let feed = merge_and_rank([group(0), group(1), group(2), group(50)], MAX_NOTIFICATIONS);
        assert_eq!(feed.len(), MAX_NOTIFICATIONS);
        assert!(feed.windows(2).all(|w| w[0].notify_at >= w[1].notify_at));
        assert_eq!(username(&feed[0]), "u0-0");
    }

    #[test]
    fn test_ties_keep_generator_order() {
        let at = OffsetDateTime::now_utc();
        let feed = merge_and_rank(
            [vec![follow_at("first", at)], vec![follow_at("second", at)]],
            MAX_NOTIFICATIONS,
        );
        assert_eq!(username(&feed[0]), "first");
        assert_eq!(username(&feed[1]), "second");
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview("short"), "short...");
        assert_eq!(preview("ééééééééééééééééééééééé"), format!("{}...", "é".repeat(20)));
    }

    #[test]
    fn test_serialized_shape() {
        let at = time::macros::datetime!(2024-01-02 03:04:05 UTC);
        let value = serde_json::to_value(follow_at("migo", at)).unwrap();
        assert_eq!(value["type"], "follow");
        assert_eq!(value["username"], "migo");
        assert_eq!(value["followedBy"], serde_json::json!(["someone"]));
        assert_eq!(value["notifyAt"], "2024-01-02T03:04:05Z");
    }
}
