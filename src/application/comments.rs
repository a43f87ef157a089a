use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::CommentRecord;
use crate::domain::posts::normalize_comment_text;
use crate::domain::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("invalid comment: {0}")]
    Invalid(FieldErrors),
    #[error("post not found")]
    PostNotFound,
    #[error("comment not found")]
    NotFound,
    #[error("user {user_id} is not the author of comment {comment_id}")]
    NotAuthor { comment_id: i64, user_id: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    posts: Arc<dyn PostsRepo>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentsRepo>, posts: Arc<dyn PostsRepo>) -> Self {
        Self { comments, posts }
    }

    pub async fn add(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentRecord, CommentError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(CommentError::PostNotFound);
        }
        let text = normalize_comment_text(text)
            .map_err(|err| CommentError::Invalid(FieldErrors::from(err)))?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text,
            })
            .await
            .map_err(|err| match err {
                RepoError::Integrity { .. } => CommentError::PostNotFound,
                other => CommentError::Repo(other),
            })?;

        info!(
            target = "yatube::comments",
            comment_id = comment.id,
            post_id,
            author_id,
            "comment added"
        );
        Ok(comment)
    }

    pub async fn list(&self, post_id: i64) -> Result<Vec<CommentRecord>, CommentError> {
        Ok(self.comments.list_comments(post_id).await?)
    }

    /// Returns the removed comment so the caller can redirect to its post.
    pub async fn delete(
        &self,
        actor_id: i64,
        comment_id: i64,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;
        if comment.author_id != actor_id {
            return Err(CommentError::NotAuthor {
                comment_id,
                user_id: actor_id,
            });
        }
        if !self.comments.delete_comment(comment_id).await? {
            return Err(CommentError::NotFound);
        }
        info!(target = "yatube::comments", comment_id, "comment deleted");
        Ok(comment)
    }
}
