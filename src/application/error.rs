use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{feed::FeedError, repos::RepoError},
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Diagnostics attached to a failed response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    /// The error's message followed by each of its sources.
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut next = error.source();
        while let Some(cause) = next {
            messages.push(cause.to_string());
            next = cause.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// A plain-text error page: a short public message, the full story in the report.
#[derive(Debug)]
pub struct HttpError {
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        Self::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    /// Storage failures: conflicts surface as 409, outages as 503, the rest as 500.
    pub fn from_repo(source: &'static str, err: RepoError) -> Self {
        let (status, public_message) = match &err {
            RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Duplicate record"),
            RepoError::Integrity { .. } => (StatusCode::CONFLICT, "Integrity constraint violated"),
            RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
            RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
            RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Persistence error"),
        };
        Self::from_error(source, status, public_message, &err)
    }

    pub fn status(&self) -> StatusCode {
        self.report.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.report.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "infra::http::feed_error_to_http_error";
        match error {
            FeedError::Repo(err) => Self::from_repo(SOURCE, err),
            not_found => {
                Self::from_error(SOURCE, StatusCode::NOT_FOUND, "Page not found", &not_found)
            }
        }
    }
}

/// Errors that end the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_the_source_chain() {
        let report = ErrorReport::from_error(
            "test",
            StatusCode::INTERNAL_SERVER_ERROR,
            &InfraError::Connect(sqlx::Error::PoolTimedOut),
        );
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0], "could not connect to the database");
    }

    #[test]
    fn repo_errors_map_to_statuses() {
        let cases = [
            (RepoError::duplicate("groups_slug_key"), StatusCode::CONFLICT),
            (RepoError::NotFound, StatusCode::NOT_FOUND),
            (RepoError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (
                RepoError::from_persistence("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let response = HttpError::from_repo("test", err).into_response();
            assert_eq!(response.status(), status);
            assert!(response.extensions().get::<ErrorReport>().is_some());
        }
    }

    #[test]
    fn unknown_feed_targets_are_not_found() {
        let err = HttpError::from(FeedError::UnknownGroup("missing".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
