use std::sync::Arc;

use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    error::StoreError,
    id::Id,
    models::{MiniUser, PendingNotification, User, USERS},
    store::{decode, encode, DocumentStore, Filter, Mutation},
};

/// View over the user collection: follow edges, inverse lookups and the
/// per-user state the delivery layer writes.
///
/// There is no reverse index; "who follows X" scans every user.
#[derive(Clone)]
pub struct SocialGraph {
    store: Arc<dyn DocumentStore>,
}

impl SocialGraph {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn all_users(&self) -> Result<Vec<User>, StoreError> {
        self.store
            .find(USERS, &Filter::All)
            .await?
            .into_iter()
            .map(|document| decode(USERS, document))
            .collect()
    }

    pub async fn user(&self, id: &Id) -> Result<Option<User>, StoreError> {
        self.store
            .find_one(USERS, &Filter::id(id))
            .await?
            .map(|document| decode(USERS, document))
            .transpose()
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.store
            .find_one(USERS, &Filter::eq("username", username))
            .await?
            .map(|document| decode(USERS, document))
            .transpose()
    }

    /// Users `user` follows, as stored on their document. Unknown users follow nobody.
    pub async fn follow_edges(&self, user: &Id) -> Result<Vec<MiniUser>, StoreError> {
        Ok(self.user(user).await?.map(|u| u.following).unwrap_or_default())
    }

    pub async fn followers_of(&self, user: &Id) -> Result<Vec<MiniUser>, StoreError> {
        Ok(self
            .all_users()
            .await?
            .into_iter()
            .filter(|u| u.follows(user))
            .map(|u| u.mini())
            .collect())
    }

    pub async fn add_user(&self, user: &User) -> Result<(), StoreError> {
        self.store.insert_one(USERS, encode(USERS, user)?).await
    }

    /// Returns false when the edge already existed or `user` is `target`.
    pub async fn follow(&self, user: &Id, target: &MiniUser) -> Result<bool, StoreError> {
        if *user == target.id {
            return Ok(false);
        }
        let result = self
            .store
            .update_one(
                USERS,
                &Filter::id(user),
                &Mutation::add_to_set("following", encode(USERS, target)?, "id"),
            )
            .await?;
        Ok(result.modified > 0)
    }

    pub async fn unfollow(&self, user: &Id, target: &Id) -> Result<bool, StoreError> {
        let result = self
            .store
            .update_one(
                USERS,
                &Filter::id(user),
                &Mutation::pull("following", Filter::id(target)),
            )
            .await?;
        Ok(result.modified > 0)
    }

    /// Overwrites the user's pending slot. Any earlier pending notification is lost.
    pub async fn set_pending(&self, user: &Id, notification: &PendingNotification) -> Result<(), StoreError> {
        self.store
            .update_one(
                USERS,
                &Filter::id(user),
                &Mutation::set("newNotification", encode(USERS, notification)?),
            )
            .await?;
        Ok(())
    }

    /// Reads and clears the pending slot.
    ///
    /// The slot is only cleared if it still holds what was read, so a
    /// notification written in between survives for the next pickup. Of two
    /// concurrent takers only the one whose clear lands gets the notification.
    pub async fn take_pending(&self, user: &Id) -> Result<Option<PendingNotification>, StoreError> {
        let Some(pending) = self.user(user).await?.and_then(|u| u.new_notification) else {
            return Ok(None);
        };

        let cleared = self
            .store
            .update_one(
                USERS,
                &Filter::And(vec![
                    Filter::id(user),
                    Filter::eq("newNotification", encode(USERS, &pending)?),
                ]),
                &Mutation::set("newNotification", Value::Null),
            )
            .await?;

        Ok((cleared.modified > 0).then_some(pending))
    }

    pub async fn update_last_seen(&self, user: &Id, at: OffsetDateTime) -> Result<(), StoreError> {
        let at = at.format(&Rfc3339)?;
        self.store
            .update_one(USERS, &Filter::id(user), &Mutation::set("lastSeen", at))
            .await?;
        Ok(())
    }
}
