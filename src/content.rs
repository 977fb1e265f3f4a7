use std::sync::Arc;

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::{
    error::StoreError,
    id::{short_id, Id},
    models::{Comment, Like, Media, MiniUser, Post, User, POSTS},
    store::{decode, encode, DocumentStore, Filter, Mutation},
};

/// How far back "recent" reaches for posts, likes and comments.
pub const TRAILING_WINDOW: Duration = Duration::days(7);

const COMMENT_ID_LEN: usize = 6;

/// Own posts that saw engagement inside the trailing window. Like and comment
/// lists are returned whole; per-entry window filtering is the caller's job.
#[derive(Debug, Default)]
pub struct EngagedPosts {
    pub liked_posts: Vec<Post>,
    pub commented_posts: Vec<Post>,
}

#[derive(Clone)]
pub struct ContentQuery {
    store: Arc<dyn DocumentStore>,
}

impl ContentQuery {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn posts(&self, filter: &Filter) -> Result<Vec<Post>, StoreError> {
        let mut posts = self
            .store
            .find(POSTS, filter)
            .await?
            .into_iter()
            .map(|document| decode::<Post>(POSTS, document))
            .collect::<Result<Vec<_>, _>>()?;
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(posts)
    }

    /// Posts by anyone `user` follows created at or after `since`, newest first.
    pub async fn query_recent_followed_posts(
        &self,
        user: &User,
        since: OffsetDateTime,
    ) -> Result<Vec<Post>, StoreError> {
        if user.following.is_empty() {
            return Ok(Vec::new());
        }

        let followees = user
            .following
            .iter()
            .map(|followee| Value::String(followee.id.to_string()));
        self.posts(&Filter::And(vec![
            Filter::is_in("createdBy.id", followees),
            Filter::CreatedSince(since),
        ]))
        .await
    }

    /// `user`'s own posts having at least one like (resp. comment) created
    /// within [`TRAILING_WINDOW`] of `now`.
    pub async fn query_own_posts_with_recent_engagement(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> Result<EngagedPosts, StoreError> {
        let since = now - TRAILING_WINDOW;
        let posts = self.posts_by_creator(&user.id).await?;

        let liked_posts = posts
            .iter()
            .filter(|post| post.likes.iter().any(|like| like.created_at >= since))
            .cloned()
            .collect();
        let commented_posts = posts
            .into_iter()
            .filter(|post| post.comments.iter().any(|comment| comment.created_at >= since))
            .collect();

        Ok(EngagedPosts {
            liked_posts,
            commented_posts,
        })
    }

    pub async fn posts_by_creator(&self, creator: &Id) -> Result<Vec<Post>, StoreError> {
        self.posts(&Filter::eq("createdBy.id", creator.to_string())).await
    }

    pub async fn get_post(&self, id: &Id) -> Result<Option<Post>, StoreError> {
        self.store
            .find_one(POSTS, &Filter::id(id))
            .await?
            .map(|document| decode(POSTS, document))
            .transpose()
    }

    pub async fn add_post(&self, creator: MiniUser, media: Vec<Media>, text: String) -> Result<Post, StoreError> {
        let post = Post {
            id: Id::new(),
            creator,
            media,
            text,
            likes: Vec::new(),
            comments: Vec::new(),
        };
        self.store.insert_one(POSTS, encode(POSTS, &post)?).await?;
        Ok(post)
    }

    /// One like per user; returns false if `by` had already liked the post.
    pub async fn like_post(&self, post: &Id, by: MiniUser, at: OffsetDateTime) -> Result<bool, StoreError> {
        let like = encode(POSTS, &Like { by, created_at: at })?;
        let result = self
            .store
            .update_one(POSTS, &Filter::id(post), &Mutation::add_to_set("likes", like, "id"))
            .await?;
        Ok(result.modified > 0)
    }

    pub async fn unlike_post(&self, post: &Id, user: &Id) -> Result<bool, StoreError> {
        let result = self
            .store
            .update_one(POSTS, &Filter::id(post), &Mutation::pull("likes", Filter::id(user)))
            .await?;
        Ok(result.modified > 0)
    }

    /// Appends a comment; `None` if the post does not exist.
    pub async fn add_comment(
        &self,
        post: &Id,
        by: MiniUser,
        text: String,
        at: OffsetDateTime,
    ) -> Result<Option<Comment>, StoreError> {
        let comment = Comment {
            id: short_id(COMMENT_ID_LEN),
            creator: by,
            text,
            created_at: at,
            likes: Vec::new(),
        };
        let result = self
            .store
            .update_one(POSTS, &Filter::id(post), &Mutation::push("comments", encode(POSTS, &comment)?))
            .await?;
        Ok((result.matched > 0).then_some(comment))
    }

    /// Likes a comment. Returns the comment and whether a new like was written,
    /// or `None` if the post or comment does not exist.
    pub async fn like_comment(
        &self,
        post: &Id,
        comment_id: &str,
        by: MiniUser,
        at: OffsetDateTime,
    ) -> Result<Option<(Comment, bool)>, StoreError> {
        let like = encode(POSTS, &Like { by, created_at: at })?;
        let result = self
            .store
            .update_one(
                POSTS,
                &Filter::id(post),
                &Mutation::each("comments", Filter::eq("id", comment_id), Mutation::add_to_set("likes", like, "id")),
            )
            .await?;
        if result.matched == 0 {
            return Ok(None);
        }

        let comment = self
            .get_post(post)
            .await?
            .and_then(|post| post.comments.into_iter().find(|c| c.id == comment_id));
        Ok(comment.map(|comment| (comment, result.modified > 0)))
    }
}
