use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    CreatePostParams, PostScope, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{GroupRef, PostRecord};

use super::util::convert_count;
use super::{PostgresRepositories, map_sqlx_error};

const POST_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.author_id, \
     u.username AS author_username, p.group_id, g.slug AS group_slug, \
     g.title AS group_title, p.image \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id \
     WHERE 1=1 ";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
    image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };
        Self {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: row.author_username,
            group,
            image: row.image,
        }
    }
}

impl PostgresRepositories {
    fn apply_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: PostScope) {
        match scope {
            PostScope::All => {}
            PostScope::Group(group_id) => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(group_id);
            }
            PostScope::Author(author_id) => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            PostScope::FollowedBy(follower_id) => {
                qb.push(" AND p.author_id IN (SELECT f.author_id FROM follows f WHERE f.follower_id = ");
                qb.push_bind(follower_id);
                qb.push(")");
            }
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostScope,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let limit = i64::try_from(page.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let mut qb = QueryBuilder::new(POST_SELECT);
        Self::apply_scope(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_scope(&mut qb, scope);
        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(POST_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);
        qb.build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(PostRecord::from))
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (author_id, text, group_id, image) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(params.author_id)
        .bind(params.text)
        .bind(params.group_id)
        .bind(params.image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let result = sqlx::query(
            "UPDATE posts SET text = $2, group_id = $3, image = $4 WHERE id = $1",
        )
        .bind(params.id)
        .bind(params.text)
        .bind(params.group_id)
        .bind(params.image)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.find_post(params.id).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
