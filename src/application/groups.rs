use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CreateGroupParams, GroupsRepo, RepoError, UpdateGroupParams, constraints,
};
use crate::domain::entities::GroupRecord;
use crate::domain::groups::{normalize_description, normalize_slug, normalize_title};
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};
use crate::domain::validation::FieldErrors;

const SLUG_TAKEN_MESSAGE: &str = "Group with this Slug already exists.";

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("invalid group: {0}")]
    Invalid(FieldErrors),
    #[error("group not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct GroupInput {
    pub title: String,
    /// Blank means "derive from the title".
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    repo: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(repo: Arc<dyn GroupsRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.repo.list_groups().await?)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, GroupError> {
        Ok(self.repo.find_group_by_slug(slug).await?)
    }

    pub async fn create(&self, input: GroupInput) -> Result<GroupRecord, GroupError> {
        let (title, slug, description) = self.validate(&input)?;
        let slug = match slug {
            Some(slug) => slug,
            None => self.derive_unique_slug(&title).await?,
        };

        let group = self
            .repo
            .create_group(CreateGroupParams {
                title,
                slug,
                description,
            })
            .await
            .map_err(map_slug_conflict)?;

        info!(target = "yatube::groups", group_id = group.id, slug = %group.slug, "group created");
        Ok(group)
    }

    pub async fn update(&self, id: i64, input: GroupInput) -> Result<GroupRecord, GroupError> {
        let existing = self.repo.find_group(id).await?.ok_or(GroupError::NotFound)?;
        let (title, slug, description) = self.validate(&input)?;
        let slug = slug.unwrap_or(existing.slug);

        self.repo
            .update_group(UpdateGroupParams {
                id,
                title,
                slug,
                description,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => GroupError::NotFound,
                other => map_slug_conflict(other),
            })
    }

    /// Posts filed under the group survive without one.
    pub async fn delete(&self, id: i64) -> Result<(), GroupError> {
        if !self.repo.delete_group(id).await? {
            return Err(GroupError::NotFound);
        }
        info!(target = "yatube::groups", group_id = id, "group deleted");
        Ok(())
    }

    fn validate(
        &self,
        input: &GroupInput,
    ) -> Result<(String, Option<String>, String), GroupError> {
        let mut errors = FieldErrors::new();
        let title = errors.record(normalize_title(&input.title));
        let slug = errors.record(normalize_slug(input.slug.as_deref()));
        let description = normalize_description(&input.description);

        match (title, slug) {
            (Some(title), Some(slug)) => Ok((title, slug, description)),
            _ => Err(GroupError::Invalid(errors)),
        }
    }

    async fn derive_unique_slug(&self, title: &str) -> Result<String, GroupError> {
        let repo = self.repo.clone();
        let result = generate_unique_slug_async(title, move |candidate| {
            let repo = repo.clone();
            async move { repo.find_group_by_slug(&candidate).await.map(|found| found.is_none()) }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Predicate(err)) => Err(GroupError::Repo(err)),
            Err(SlugAsyncError::Slug(err)) => {
                Err(GroupError::Invalid(FieldErrors::single("slug", err.to_string())))
            }
        }
    }
}

fn map_slug_conflict(err: RepoError) -> GroupError {
    match err {
        RepoError::Duplicate { constraint } if constraint == constraints::GROUPS_SLUG => {
            GroupError::Invalid(FieldErrors::single("slug", SLUG_TAKEN_MESSAGE))
        }
        other => GroupError::Repo(other),
    }
}
