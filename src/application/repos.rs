//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

/// Unique constraint names shared by the Postgres schema and the in-memory store.
pub mod constraints {
    pub const USERS_USERNAME: &str = "users_username_key";
    pub const GROUPS_SLUG: &str = "groups_slug_key";
    pub const FOLLOWS_PAIR: &str = "follows_follower_author_key";
    pub const SESSIONS_PREFIX: &str = "sessions_prefix_key";
}

/// Which posts a feed covers. Every scope orders by `created_at DESC, id DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Group(i64),
    Author(i64),
    FollowedBy(i64),
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct UpdateGroupParams {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub user_id: i64,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError>;

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn find_group(&self, id: i64) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;

    async fn update_group(&self, params: UpdateGroupParams) -> Result<GroupRecord, RepoError>;

    /// Removes the group; its posts stay and lose their group.
    async fn delete_group(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        scope: PostScope,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Removes the post together with its comments.
    async fn delete_post(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    /// Comments under a post, oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError>;

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError>;

    async fn delete_comment(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Inserts the edge; `None` when it already existed.
    async fn create_follow(
        &self,
        follower_id: i64,
        author_id: i64,
    ) -> Result<Option<FollowRecord>, RepoError>;

    async fn delete_follow(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn follow_exists(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError>;

    async fn count_following(&self, follower_id: i64) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
    -> Result<SessionRecord, RepoError>;

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError>;

    async fn revoke_session(&self, id: i64, revoked_at: OffsetDateTime)
    -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}

/// Everything a storage backend has to provide.
pub trait Repositories:
    UsersRepo
    + GroupsRepo
    + PostsRepo
    + PostsWriteRepo
    + CommentsRepo
    + FollowsRepo
    + SessionsRepo
    + HealthRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: UsersRepo
        + GroupsRepo
        + PostsRepo
        + PostsWriteRepo
        + CommentsRepo
        + FollowsRepo
        + SessionsRepo
        + HealthRepo
        + 'static
{
}
