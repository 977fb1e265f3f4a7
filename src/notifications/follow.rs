use std::collections::HashMap;

use crate::{
    id::Id,
    models::{MiniUser, User},
};

use super::{push_distinct, rank, NotificationEvent, NotificationKind};

/// Follow notifications for `requester`, given every user in the system.
///
/// A requester who follows nobody gets every followed user in the system
/// (whoever followed them), as an onboarding feed. Otherwise only edges out of
/// the requester's followees are considered and targets already followed are
/// dropped. Entries are grouped per target, the requester is never a target,
/// and `notifyAt` is the target's id-derived creation time.
pub fn follow_notifications(requester: &User, users: &[User]) -> Vec<NotificationEvent> {
    // The stored record is fresher than whatever the session carried.
    let following = users
        .iter()
        .find(|u| u.id == requester.id)
        .map_or(&requester.following, |u| &u.following);
    let graph_mode = !following.is_empty();

    let sources = users
        .iter()
        .filter(|u| !graph_mode || following.iter().any(|f| f.id == u.id));

    let mut grouped: Vec<(MiniUser, Vec<String>)> = Vec::new();
    let mut index: HashMap<Id, usize> = HashMap::new();
    for source in sources {
        for target in &source.following {
            let slot = *index.entry(target.id).or_insert_with(|| {
                grouped.push((target.clone(), Vec::new()));
                grouped.len() - 1
            });
            push_distinct(&mut grouped[slot].1, &source.username);
        }
    }

    let mut notifications: Vec<_> = grouped
        .into_iter()
        .filter(|(target, _)| target.id != requester.id)
        .filter(|(target, _)| !following.iter().any(|f| f.id == target.id))
        .map(|(target, followed_by)| NotificationEvent {
            notify_at: target.id.created_at(),
            kind: NotificationKind::Follow {
                user: target,
                followed_by,
            },
        })
        .collect();
    rank(&mut notifications);
    notifications
}
