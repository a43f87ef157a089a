use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::follows::ensure_can_follow;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("author `{0}` not found")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// `Ok(true)` when a new edge was stored, `Ok(false)` when it already existed.
    pub async fn follow(&self, follower_id: i64, author: &str) -> Result<bool, FollowError> {
        let author = self.author(author).await?;
        ensure_can_follow(follower_id, author.id)?;

        let created = self
            .follows
            .create_follow(follower_id, author.id)
            .await?
            .is_some();
        if created {
            info!(target = "yatube::follows", follower_id, author_id = author.id, "follow created");
        } else {
            debug!(
                target = "yatube::follows",
                follower_id,
                author_id = author.id,
                "follow already present"
            );
        }
        Ok(created)
    }

    /// `Ok(false)` when there was nothing to remove.
    pub async fn unfollow(&self, follower_id: i64, author: &str) -> Result<bool, FollowError> {
        let author = self.author(author).await?;
        let removed = self.follows.delete_follow(follower_id, author.id).await?;
        if removed {
            info!(target = "yatube::follows", follower_id, author_id = author.id, "follow removed");
        }
        Ok(removed)
    }

    pub async fn is_following(
        &self,
        follower_id: i64,
        author_id: i64,
    ) -> Result<bool, FollowError> {
        Ok(self.follows.follow_exists(follower_id, author_id).await?)
    }

    pub async fn counts(&self, user_id: i64) -> Result<FollowCounts, FollowError> {
        Ok(FollowCounts {
            followers: self.follows.count_followers(user_id).await?,
            following: self.follows.count_following(user_id).await?,
        })
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
