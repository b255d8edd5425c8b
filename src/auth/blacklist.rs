use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::session::{SessionManager, SessionResult};
use crate::cache::keys::{token_blacklist_key, user_blacklist_key};
use crate::cache::{CacheResult, CacheStore};

/// Outlives an access token and a full session, so a revoked credential can
/// never become usable again before its entry lapses.
pub const BLACKLIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const REVOKED: &str = "1";

/// Hex sha256 of a raw token. The token itself is never written anywhere.
pub fn token_digest(raw_token: &str) -> String {
    format!("{:x}", Sha256::digest(raw_token.as_bytes()))
}

#[derive(Clone)]
pub struct Blacklist {
    cache: Arc<dyn CacheStore>,
    sessions: SessionManager,
}

impl Blacklist {
    pub fn new(cache: Arc<dyn CacheStore>, sessions: SessionManager) -> Self {
        Self { cache, sessions }
    }

    pub async fn blacklist_token(&self, raw_token: &str) -> CacheResult<()> {
        self.cache
            .set(
                &token_blacklist_key(&token_digest(raw_token)),
                REVOKED.to_string(),
                BLACKLIST_TTL,
            )
            .await
    }

    pub async fn is_token_blacklisted(&self, raw_token: &str) -> CacheResult<bool> {
        self.cache
            .exists(&token_blacklist_key(&token_digest(raw_token)))
            .await
    }

    /// Flags every session the user holds right now and returns their ids.
    /// Sessions created afterwards are not affected.
    pub async fn blacklist_all_user_sessions(&self, user_id: Uuid) -> SessionResult<Vec<String>> {
        let session_ids: Vec<String> = self
            .sessions
            .list_active_sessions(user_id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        try_join_all(session_ids.iter().map(|session_id| {
            let key = user_blacklist_key(user_id, session_id);
            let cache = &self.cache;
            async move { cache.set(&key, REVOKED.to_string(), BLACKLIST_TTL).await }
        }))
        .await?;

        tracing::info!(%user_id, count = session_ids.len(), "Blacklisted user sessions");
        Ok(session_ids)
    }

    pub async fn is_user_session_blacklisted(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> CacheResult<bool> {
        self.cache
            .exists(&user_blacklist_key(user_id, session_id))
            .await
    }
}
