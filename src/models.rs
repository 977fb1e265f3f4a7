use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::id::Id;

pub const USERS: &str = "user";
pub const POSTS: &str = "post";
pub const CONVERSATIONS: &str = "conversation";

/// Projection of a [`User`] embedded in posts, likes and follow lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniUser {
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub profile_picture: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub following: Vec<MiniUser>,
    /// Single pending slot, overwritten by each undeliverable notification.
    #[serde(default)]
    pub new_notification: Option<PendingNotification>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_seen: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn mini(&self) -> MiniUser {
        MiniUser {
            id: self.id,
            username: self.username.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }

    pub fn follows(&self, id: &Id) -> bool {
        self.following.iter().any(|f| f.id == *id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    #[serde(rename = "createdBy")]
    pub creator: MiniUser,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn mini(&self) -> MiniPost {
        MiniPost {
            id: self.id,
            media: self.media.clone(),
            text: self.text.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(flatten)]
    pub by: MiniUser,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(rename = "createdBy")]
    pub creator: MiniUser,
    #[serde(rename = "comment")]
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub likes: Vec<Like>,
}

impl Comment {
    pub fn mini(&self) -> MiniComment {
        MiniComment {
            id: self.id.clone(),
            creator: self.creator.clone(),
            text: self.text.clone(),
        }
    }
}

/// Payload pushed to a post owner when the post is engaged with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiniPost {
    pub id: Id,
    pub media: Vec<Media>,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiniComment {
    pub id: String,
    #[serde(rename = "createdBy")]
    pub creator: MiniUser,
    #[serde(rename = "comment")]
    pub text: String,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_like_flattens_liker_fields() {
        let by = MiniUser {
            id: Id::new(),
            username: "migo".into(),
            profile_picture: "p.jpg".into(),
        };
        let like = Like {
            by: by.clone(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let value = serde_json::to_value(&like).unwrap();
        assert_eq!(value["username"], json!("migo"));
        assert_eq!(value["profilePicture"], json!("p.jpg"));
        assert_eq!(value["createdAt"], json!("1970-01-01T00:00:00Z"));
        assert_eq!(value["id"], json!(by.id.to_string()));
    }

    #[test]
    fn test_user_defaults_missing_fields() {
        let id = Id::new();
        let user: User = serde_json::from_value(json!({ "id": id, "username": "mago" })).unwrap();
        assert!(user.following.is_empty());
        assert!(user.new_notification.is_none());
        assert!(user.last_seen.is_none());
    }
}
