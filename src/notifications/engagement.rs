use time::OffsetDateTime;

use crate::models::{MiniUser, Post, User};

use super::{preview, push_distinct, NotificationEvent, NotificationKind};

/// One engagement (like or comment) by someone on a post.
struct Engagement<'a> {
    by: &'a MiniUser,
    at: OffsetDateTime,
    text: &'a str,
}

/// Engagements by others since `since`, newest first, with the distinct
/// usernames behind them. `None` if nothing qualifies.
fn recent_by_others<'a>(
    requester: &User,
    engagements: impl Iterator<Item = Engagement<'a>>,
    since: OffsetDateTime,
) -> Option<(Engagement<'a>, Vec<String>)> {
    let mut recent: Vec<_> = engagements
        .filter(|e| e.by.id != requester.id && e.at >= since)
        .collect();
    recent.sort_by(|a, b| b.at.cmp(&a.at));

    let mut usernames = Vec::new();
    for engagement in &recent {
        push_distinct(&mut usernames, &engagement.by.username);
    }

    let latest = recent.into_iter().next()?;
    Some((latest, usernames))
}

/// One notification per post of `requester` liked by someone else since
/// `since`, fronted by the most recent liker.
pub fn post_like_notifications(requester: &User, posts: &[Post], since: OffsetDateTime) -> Vec<NotificationEvent> {
    posts
        .iter()
        .filter_map(|post| {
            let likes = post.likes.iter().map(|like| Engagement {
                by: &like.by,
                at: like.created_at,
                text: &post.text,
            });
            let (latest, likes) = recent_by_others(requester, likes, since)?;

            Some(NotificationEvent {
                notify_at: latest.at,
                kind: NotificationKind::PostLike {
                    post_id: post.id,
                    username: latest.by.username.clone(),
                    profile_picture: latest.by.profile_picture.clone(),
                    media: post.media.first().cloned(),
                    text: preview(latest.text),
                    likes,
                },
            })
        })
        .collect()
}

/// Same as [`post_like_notifications`] for comments; the preview is the
/// newest comment's text.
pub fn post_comment_notifications(requester: &User, posts: &[Post], since: OffsetDateTime) -> Vec<NotificationEvent> {
    posts
        .iter()
        .filter_map(|post| {
            let comments = post.comments.iter().map(|comment| Engagement {
                by: &comment.creator,
                at: comment.created_at,
                text: &comment.text,
            });
            let (latest, comments) = recent_by_others(requester, comments, since)?;

            Some(NotificationEvent {
                notify_at: latest.at,
                kind: NotificationKind::PostComment {
                    post_id: post.id,
                    username: latest.by.username.clone(),
                    profile_picture: latest.by.profile_picture.clone(),
                    media: post.media.first().cloned(),
                    text: preview(latest.text),
                    comments,
                },
            })
        })
        .collect()
}
