use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::domain::posts::normalize_post_text;
use crate::domain::validation::FieldErrors;

pub const UNKNOWN_GROUP_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("invalid post: {0}")]
    Invalid(FieldErrors),
    #[error("post not found")]
    NotFound,
    #[error("user {user_id} is not the author of post {post_id}")]
    NotAuthor { post_id: i64, user_id: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Removes stored post images once nothing references them.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn remove_image(&self, stored_path: &str) -> Result<(), std::io::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<i64>,
}

/// What to do with the image when a post is edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    #[default]
    Keep,
    Replace(String),
    Clear,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    images: Option<Arc<dyn ImageStore>>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            groups,
            images: None,
        }
    }

    pub fn with_images(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    pub async fn find(&self, id: i64) -> Result<PostRecord, PostError> {
        self.reader.find_post(id).await?.ok_or(PostError::NotFound)
    }

    pub async fn create(
        &self,
        author_id: i64,
        input: PostInput,
        image: Option<String>,
    ) -> Result<PostRecord, PostError> {
        let text = self.validate(&input).await?;
        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id,
                text,
                group_id: input.group_id,
                image,
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author_id,
            group_id = input.group_id,
            "post created"
        );
        Ok(post)
    }

    /// Only the author may edit; anyone else gets `NotAuthor`.
    pub async fn edit(
        &self,
        actor_id: i64,
        post_id: i64,
        input: PostInput,
        image: ImageChange,
    ) -> Result<PostRecord, PostError> {
        let existing = self.authored(actor_id, post_id).await?;
        let text = self.validate(&input).await?;

        let (image, stale) = match image {
            ImageChange::Keep => (existing.image.clone(), None),
            ImageChange::Replace(path) => (Some(path), existing.image.clone()),
            ImageChange::Clear => (None, existing.image.clone()),
        };

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                group_id: input.group_id,
                image,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostError::NotFound,
                other => PostError::Repo(other),
            })?;

        if let Some(stale) = stale.filter(|path| post.image.as_deref() != Some(path.as_str())) {
            self.discard_image(&stale).await;
        }

        info!(target = "yatube::posts", post_id, "post edited");
        Ok(post)
    }

    /// Deleting a post takes its comments and image with it.
    pub async fn delete(&self, actor_id: i64, post_id: i64) -> Result<PostRecord, PostError> {
        let existing = self.authored(actor_id, post_id).await?;
        if !self.writer.delete_post(post_id).await? {
            return Err(PostError::NotFound);
        }
        if let Some(image) = existing.image.as_deref() {
            self.discard_image(image).await;
        }
        info!(target = "yatube::posts", post_id, "post deleted");
        Ok(existing)
    }

    async fn authored(&self, actor_id: i64, post_id: i64) -> Result<PostRecord, PostError> {
        let post = self.find(post_id).await?;
        if !post.is_authored_by(actor_id) {
            return Err(PostError::NotAuthor {
                post_id,
                user_id: actor_id,
            });
        }
        Ok(post)
    }

    async fn validate(&self, input: &PostInput) -> Result<String, PostError> {
        let mut errors = FieldErrors::new();
        let text = errors.record(normalize_post_text(&input.text));

        if let Some(group_id) = input.group_id
            && self.groups.find_group(group_id).await?.is_none()
        {
            errors.push("group", UNKNOWN_GROUP_MESSAGE);
        }

        match text {
            Some(text) if errors.is_empty() => Ok(text),
            _ => Err(PostError::Invalid(errors)),
        }
    }

    async fn discard_image(&self, stored_path: &str) {
        let Some(images) = &self.images else {
            return;
        };
        if let Err(err) = images.remove_image(stored_path).await {
            warn!(
                target = "yatube::posts",
                path = stored_path,
                error = %err,
                "failed to remove post image"
            );
        }
    }
}
