//! Login sessions backed by opaque bearer tokens.
//!
//! Tokens look like `ys_<prefix>_<secret>`. Only the prefix and a SHA-256
//! digest of the secret are stored.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};

const TOKEN_PREFIX: &str = "ys";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("user `{0}` not found")]
    UnknownUser(String),
    #[error("missing session token")]
    Missing,
    #[error("invalid session token")]
    Invalid,
    #[error("expired session token")]
    Expired,
    #[error("revoked session token")]
    Revoked,
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub record: SessionRecord,
    pub user: UserRecord,
    pub token: String,
}

/// The authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub username: String,
    pub session_id: i64,
}

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionsRepo>,
    users: Arc<dyn UsersRepo>,
    ttl: Option<Duration>,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self {
            sessions,
            users,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn issue(&self, username: &str) -> Result<SessionIssued, SessionError> {
        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(username.to_string()))?;

        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let expires_at = self.ttl.map(|ttl| OffsetDateTime::now_utc() + ttl);

        let record = self
            .sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                expires_at,
            })
            .await?;

        info!(
            target = "yatube::sessions",
            session_id = record.id,
            user_id = user.id,
            "session issued"
        );
        Ok(SessionIssued {
            record,
            user,
            token,
        })
    }

    pub async fn authenticate(&self, token: &str) -> Result<Viewer, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::Missing);
        }
        let parsed = Self::parse_token(token).ok_or(SessionError::Invalid)?;
        let record = self
            .sessions
            .find_session_by_prefix(&parsed.prefix)
            .await?
            .ok_or(SessionError::Invalid)?;

        let now = OffsetDateTime::now_utc();
        if let Some(revoked_at) = record.revoked_at
            && revoked_at <= now
        {
            return Err(SessionError::Revoked);
        }
        if let Some(expires_at) = record.expires_at
            && expires_at <= now
        {
            return Err(SessionError::Expired);
        }

        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(SessionError::Invalid);
        }

        let user = self
            .users
            .find_user(record.user_id)
            .await?
            .ok_or(SessionError::Invalid)?;

        Ok(Viewer {
            user_id: user.id,
            username: user.username,
            session_id: record.id,
        })
    }

    pub async fn revoke(&self, session_id: i64) -> Result<(), SessionError> {
        self.sessions
            .revoke_session(session_id, OffsetDateTime::now_utc())
            .await?;
        info!(target = "yatube::sessions", session_id, "session revoked");
        Ok(())
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_requires_our_prefix_and_long_secret() {
        let secret = "a".repeat(MIN_SECRET_LEN);
        assert!(SessionService::parse_token(&format!("ys_abc_{secret}")).is_some());
        assert!(SessionService::parse_token(&format!("sk_abc_{secret}")).is_none());
        assert!(SessionService::parse_token("ys_abc_short").is_none());
        assert!(SessionService::parse_token(&format!("ys__{secret}")).is_none());
    }

    #[test]
    fn hashing_is_stable() {
        assert_eq!(
            SessionService::hash_secret("secret"),
            SessionService::hash_secret("secret")
        );
        assert_ne!(
            SessionService::hash_secret("secret"),
            SessionService::hash_secret("other")
        );
    }
}
