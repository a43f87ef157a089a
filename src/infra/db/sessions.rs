use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo};
use crate::domain::entities::SessionRecord;

use super::{PostgresRepositories, map_sqlx_error};

const SESSION_COLUMNS: &str = "id, user_id, prefix, hashed_secret, created_at, expires_at, revoked_at";

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    prefix: String,
    hashed_secret: Vec<u8>,
    created_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
    revoked_at: Option<OffsetDateTime>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
        }
    }
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        sqlx::query_as::<_, SessionRow>(&format!(
            "INSERT INTO sessions (user_id, prefix, hashed_secret, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(params.user_id)
        .bind(params.prefix)
        .bind(params.hashed_secret)
        .bind(params.expires_at)
        .fetch_one(self.pool())
        .await
        .map(SessionRecord::from)
        .map_err(map_sqlx_error)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE prefix = $1"
        ))
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(SessionRecord::from))
        .map_err(map_sqlx_error)
    }

    async fn revoke_session(
        &self,
        id: i64,
        revoked_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = COALESCE(revoked_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(revoked_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
