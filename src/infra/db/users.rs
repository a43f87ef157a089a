use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username) VALUES ($1) RETURNING id, username, created_at",
        )
        .bind(username)
        .fetch_one(self.pool())
        .await
        .map(UserRecord::from)
        .map_err(map_sqlx_error)
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(UserRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(UserRecord::from))
        .map_err(map_sqlx_error)
    }
}
