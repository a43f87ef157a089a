use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, \
     c.text, c.created_at \
     FROM comments c INNER JOIN users u ON u.id = c.author_id";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    author_username: String,
    text: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        sqlx::query_as::<_, CommentRow>(
            "WITH inserted AS ( \
                 INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) \
                 RETURNING id, post_id, author_id, text, created_at \
             ) \
             SELECT i.id, i.post_id, i.author_id, u.username AS author_username, i.text, i.created_at \
             FROM inserted i INNER JOIN users u ON u.id = i.author_id",
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(params.text)
        .fetch_one(self.pool())
        .await
        .map(CommentRecord::from)
        .map_err(map_sqlx_error)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at, c.id"
        ))
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(CommentRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
