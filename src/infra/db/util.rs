use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation => RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            },
            ErrorKind::ForeignKeyViolation | ErrorKind::CheckViolation => {
                RepoError::Integrity {
                    message: db.message().to_string(),
                }
            }
            ErrorKind::NotNullViolation => RepoError::InvalidInput {
                message: db.message().to_string(),
            },
            _ if db
                .message()
                .contains("canceling statement due to user request") =>
            {
                RepoError::Timeout
            }
            _ => RepoError::from_persistence(db.message()),
        },
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}
