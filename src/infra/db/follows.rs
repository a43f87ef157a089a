use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{FollowsRepo, RepoError};
use crate::domain::entities::FollowRecord;

use super::util::convert_count;
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: i64,
    follower_id: i64,
    author_id: i64,
    created_at: OffsetDateTime,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            follower_id: row.follower_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn create_follow(
        &self,
        follower_id: i64,
        author_id: i64,
    ) -> Result<Option<FollowRecord>, RepoError> {
        sqlx::query_as::<_, FollowRow>(
            "INSERT INTO follows (follower_id, author_id) VALUES ($1, $2) \
             ON CONFLICT (follower_id, author_id) DO NOTHING \
             RETURNING id, follower_id, author_id, created_at",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(FollowRecord::from))
        .map_err(map_sqlx_error)
    }

    async fn delete_follow(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND author_id = $2")
            .bind(follower_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND author_id = $2)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn count_following(&self, follower_id: i64) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }
}
