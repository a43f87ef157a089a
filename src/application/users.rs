use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{RepoError, UsersRepo, constraints};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::users::normalize_username;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UsersRepo>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UsersRepo>) -> Self {
        Self { repo }
    }

    pub async fn register(&self, username: &str) -> Result<UserRecord, UserError> {
        let username = normalize_username(username)?;
        match self.repo.create_user(&username).await {
            Ok(user) => {
                info!(
                    target = "yatube::users",
                    user_id = user.id,
                    username = %user.username,
                    "user registered"
                );
                Ok(user)
            }
            Err(RepoError::Duplicate { constraint })
                if constraint == constraints::USERS_USERNAME =>
            {
                Err(UserError::UsernameTaken(username))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserError> {
        Ok(self.repo.find_user_by_username(username).await?)
    }

    pub async fn find(&self, id: i64) -> Result<Option<UserRecord>, UserError> {
        Ok(self.repo.find_user(id).await?)
    }
}
