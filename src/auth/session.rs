//! Server-side sessions stored in the cache.
//!
//! Each session lives under `session:{id}` with a TTL equal to its duration.
//! The set `user_sessions:{user_id}` indexes the ids a user holds, so
//! per-user operations never scan the whole key space. The set is advisory:
//! members whose record has gone are pruned on read.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cache::keys::{session_key, user_sessions_key};
use crate::cache::{CacheError, CacheExt, CacheStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
    pub is_active: bool,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("session expired")]
    Expired,
    #[error("session duration must be positive")]
    InvalidDuration,
    #[error(transparent)]
    Cache(CacheError),
}

impl From<CacheError> for SessionError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound => SessionError::NotFound,
            other => SessionError::Cache(other),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Clone)]
pub struct SessionManager {
    cache: Arc<dyn CacheStore>,
}

fn expiry_after(now: DateTime<Utc>, duration: Duration) -> SessionResult<DateTime<Utc>> {
    if duration.is_zero() {
        return Err(SessionError::InvalidDuration);
    }
    let delta = chrono::Duration::from_std(duration).map_err(|_| SessionError::InvalidDuration)?;
    now.checked_add_signed(delta)
        .ok_or(SessionError::InvalidDuration)
}

impl SessionManager {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    pub async fn create_session(
        &self,
        user_id: Uuid,
        email: &str,
        ip_address: &str,
        user_agent: &str,
        duration: Duration,
    ) -> SessionResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            email: email.to_string(),
            created_at: now,
            expires_at: expiry_after(now, duration)?,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            is_active: true,
        };

        self.cache
            .set_json(&session_key(&session.id), &session, duration)
            .await?;
        self.cache
            .set_add(&user_sessions_key(user_id), &session.id, duration)
            .await?;

        tracing::info!(%user_id, session_id = %session.id, "Created session");
        Ok(session)
    }

    /// Loads a session, deleting it when its expiry has already passed even
    /// if the store has not evicted it yet.
    pub async fn get_session(&self, session_id: &str) -> SessionResult<Session> {
        let session: Session = self.cache.get_json(&session_key(session_id)).await?;

        if session.is_expired_at(Utc::now()) {
            self.cache.delete(&session_key(session_id)).await?;
            self.cache
                .set_remove(&user_sessions_key(session.user_id), session_id)
                .await?;
            return Err(SessionError::Expired);
        }

        Ok(session)
    }

    /// Deleting a session that is already gone is a no-op.
    pub async fn delete_session(&self, session_id: &str) -> SessionResult<()> {
        let key = session_key(session_id);
        match self.cache.get_json::<Session>(&key).await {
            Ok(session) => {
                self.cache
                    .set_remove(&user_sessions_key(session.user_id), session_id)
                    .await?;
            }
            Err(CacheError::NotFound) => return Ok(()),
            Err(e) if e.is_corrupt() => {
                tracing::warn!(session_id, error = %e, "Dropping undecodable session record");
            }
            Err(e) => return Err(e.into()),
        }

        self.cache.delete(&key).await?;
        tracing::info!(session_id, "Deleted session");
        Ok(())
    }

    /// Removes every session the user holds and returns how many ids the
    /// index contained.
    pub async fn delete_user_sessions(&self, user_id: Uuid) -> SessionResult<usize> {
        let index = user_sessions_key(user_id);
        let session_ids = self.cache.set_members(&index).await?;

        for session_id in &session_ids {
            self.cache.delete(&session_key(session_id)).await?;
        }
        self.cache.delete(&index).await?;

        tracing::info!(%user_id, count = session_ids.len(), "Deleted user sessions");
        Ok(session_ids.len())
    }

    pub async fn refresh_session(
        &self,
        session_id: &str,
        duration: Duration,
    ) -> SessionResult<Session> {
        let mut session = self.get_session(session_id).await?;
        if !session.is_active {
            return Err(SessionError::NotFound);
        }

        session.expires_at = expiry_after(Utc::now(), duration)?;
        self.cache
            .set_json(&session_key(session_id), &session, duration)
            .await?;
        self.cache
            .set_add(&user_sessions_key(session.user_id), session_id, duration)
            .await?;

        tracing::debug!(session_id, expires_at = %session.expires_at, "Refreshed session");
        Ok(session)
    }

    /// Missing, expired or inactive sessions are simply invalid. Only a
    /// store failure surfaces as an error.
    pub async fn is_session_valid(&self, session_id: &str) -> Result<bool, CacheError> {
        match self.get_session(session_id).await {
            Ok(session) => Ok(session.is_valid_at(Utc::now())),
            Err(SessionError::NotFound | SessionError::Expired | SessionError::InvalidDuration) => {
                Ok(false)
            }
            Err(SessionError::Cache(e)) if e.is_corrupt() => {
                tracing::warn!(session_id, error = %e, "Undecodable session record");
                Ok(false)
            }
            Err(SessionError::Cache(e)) => Err(e),
        }
    }

    /// Active sessions of a user, oldest first.
    pub async fn list_active_sessions(&self, user_id: Uuid) -> SessionResult<Vec<Session>> {
        let index = user_sessions_key(user_id);
        let mut sessions = Vec::new();

        for session_id in self.cache.set_members(&index).await? {
            match self.get_session(&session_id).await {
                Ok(session) if session.is_active => sessions.push(session),
                Ok(_) => {}
                Err(SessionError::NotFound) => {
                    self.cache.set_remove(&index, &session_id).await?;
                }
                Err(SessionError::Expired) => {}
                Err(SessionError::Cache(e)) if e.is_corrupt() => {
                    tracing::warn!(%session_id, error = %e, "Skipping undecodable session record");
                }
                Err(e) => return Err(e),
            }
        }

        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    pub async fn count_active_sessions(&self, user_id: Uuid) -> SessionResult<usize> {
        Ok(self.list_active_sessions(user_id).await?.len())
    }
}
