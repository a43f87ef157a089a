use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError, UpdateGroupParams};
use crate::domain::entities::GroupRecord;

use super::{PostgresRepositories, map_sqlx_error};

const GROUP_COLUMNS: &str = "id, title, slug, description, created_at";

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    title: String,
    slug: String,
    description: String,
    created_at: OffsetDateTime,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl GroupsRepo for PostgresRepositories {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let rows = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups ORDER BY title, id"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(GroupRecord::from).collect())
    }

    async fn find_group(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        sqlx::query_as::<_, GroupRow>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(GroupRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(GroupRecord::from))
        .map_err(map_sqlx_error)
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        sqlx::query_as::<_, GroupRow>(&format!(
            "INSERT INTO groups (title, slug, description) VALUES ($1, $2, $3) \
             RETURNING {GROUP_COLUMNS}"
        ))
        .bind(params.title)
        .bind(params.slug)
        .bind(params.description)
        .fetch_one(self.pool())
        .await
        .map(GroupRecord::from)
        .map_err(map_sqlx_error)
    }

    async fn update_group(&self, params: UpdateGroupParams) -> Result<GroupRecord, RepoError> {
        sqlx::query_as::<_, GroupRow>(&format!(
            "UPDATE groups SET title = $2, slug = $3, description = $4 WHERE id = $1 \
             RETURNING {GROUP_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.title)
        .bind(params.slug)
        .bind(params.description)
        .fetch_one(self.pool())
        .await
        .map(GroupRecord::from)
        .map_err(map_sqlx_error)
    }

    async fn delete_group(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
