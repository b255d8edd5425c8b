//! The check every protected request passes through.

use thiserror::Error;
use uuid::Uuid;

use super::blacklist::Blacklist;
use super::session::SessionManager;
use super::token::{TokenService, TokenType};
use crate::cache::CacheError;

/// Why a request was turned away. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("missing or malformed bearer credentials")]
    MissingCredentials,
    #[error("token failed verification")]
    InvalidToken,
    #[error("session is missing, inactive or expired")]
    SessionInvalid,
    #[error("token has been revoked")]
    TokenRevoked,
    #[error("session revoked by logout from all devices")]
    SessionRevokedByLogoutAll,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthFailure),
    #[error("auth backend unavailable: {0}")]
    Backend(#[from] CacheError),
}

/// Identity attached to a request that passed the gatekeeper.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: String,
    /// Raw bearer token, kept so logout can revoke it.
    pub token: String,
}

#[derive(Clone)]
pub struct Gatekeeper {
    tokens: TokenService,
    sessions: SessionManager,
    blacklist: Blacklist,
}

impl Gatekeeper {
    pub fn new(tokens: TokenService, sessions: SessionManager, blacklist: Blacklist) -> Self {
        Self {
            tokens,
            sessions,
            blacklist,
        }
    }

    /// Runs the checks in order and stops at the first failure: credentials
    /// present, token valid, session valid, token not revoked, session not
    /// revoked by logout-all. Signature checks run before any cache access.
    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<AuthContext, GateError> {
        let result = self.check(bearer).await;
        if let Err(GateError::Unauthorized(reason)) = &result {
            tracing::debug!(?reason, "Rejected request");
        }
        result
    }

    async fn check(&self, bearer: Option<&str>) -> Result<AuthContext, GateError> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthFailure::MissingCredentials)?;

        let claims = self
            .tokens
            .verify_as(token, TokenType::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                AuthFailure::InvalidToken
            })?;

        if !self.sessions.is_session_valid(&claims.session_id).await? {
            return Err(AuthFailure::SessionInvalid.into());
        }

        if self.blacklist.is_token_blacklisted(token).await? {
            return Err(AuthFailure::TokenRevoked.into());
        }

        if self
            .blacklist
            .is_user_session_blacklisted(claims.user_id, &claims.session_id)
            .await?
        {
            return Err(AuthFailure::SessionRevokedByLogoutAll.into());
        }

        Ok(AuthContext {
            user_id: claims.user_id,
            email: claims.email,
            session_id: claims.session_id,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::{CacheStore, MemoryStore, UnavailableStore};
    use crate::models::User;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    struct Fixture {
        gatekeeper: Gatekeeper,
        tokens: TokenService,
        sessions: SessionManager,
        blacklist: Blacklist,
        user: User,
    }

    fn fixture() -> Fixture {
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        let tokens = TokenService::new("gate-secret");
        let sessions = SessionManager::new(Arc::clone(&cache));
        let blacklist = Blacklist::new(cache, sessions.clone());
        Fixture {
            gatekeeper: Gatekeeper::new(tokens.clone(), sessions.clone(), blacklist.clone()),
            tokens,
            sessions,
            blacklist,
            user: User::new("a@x.com".into(), "hash".into(), "Alice".into()),
        }
    }

    async fn signed_in(f: &Fixture) -> (String, String) {
        let session = f
            .sessions
            .create_session(f.user.id, &f.user.email, "ip", "ua", DAY)
            .await
            .unwrap();
        let token = f.tokens.issue_access_token(&f.user, &session.id).unwrap();
        (session.id, token)
    }

    fn reason(result: Result<AuthContext, GateError>) -> AuthFailure {
        match result {
            Err(GateError::Unauthorized(reason)) => reason,
            other => panic!("expected an auth failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_token_yields_context() {
        let f = fixture();
        let (session_id, token) = signed_in(&f).await;

        let ctx = f.gatekeeper.authenticate(Some(&token)).await.unwrap();

        assert_eq!(ctx.user_id, f.user.id);
        assert_eq!(ctx.email, "a@x.com");
        assert_eq!(ctx.session_id, session_id);
        assert_eq!(ctx.token, token);
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let f = fixture();
        assert_eq!(reason(f.gatekeeper.authenticate(None).await), AuthFailure::MissingCredentials);
        assert_eq!(
            reason(f.gatekeeper.authenticate(Some("  ")).await),
            AuthFailure::MissingCredentials
        );
    }

    #[tokio::test]
    async fn test_garbage_and_refresh_tokens_are_invalid() {
        let f = fixture();
        let (session_id, _) = signed_in(&f).await;
        let refresh = f.tokens.issue_refresh_token(&f.user, &session_id).unwrap();

        assert_eq!(
            reason(f.gatekeeper.authenticate(Some("garbage")).await),
            AuthFailure::InvalidToken
        );
        assert_eq!(
            reason(f.gatekeeper.authenticate(Some(&refresh)).await),
            AuthFailure::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_deleted_session_is_invalid() {
        let f = fixture();
        let (session_id, token) = signed_in(&f).await;

        f.sessions.delete_session(&session_id).await.unwrap();

        assert_eq!(
            reason(f.gatekeeper.authenticate(Some(&token)).await),
            AuthFailure::SessionInvalid
        );
    }

    #[tokio::test]
    async fn test_revoked_token() {
        let f = fixture();
        let (_, token) = signed_in(&f).await;

        f.blacklist.blacklist_token(&token).await.unwrap();

        assert_eq!(
            reason(f.gatekeeper.authenticate(Some(&token)).await),
            AuthFailure::TokenRevoked
        );
    }

    #[tokio::test]
    async fn test_logout_all_revokes_session() {
        let f = fixture();
        let (_, token) = signed_in(&f).await;

        f.blacklist.blacklist_all_user_sessions(f.user.id).await.unwrap();

        assert_eq!(
            reason(f.gatekeeper.authenticate(Some(&token)).await),
            AuthFailure::SessionRevokedByLogoutAll
        );
    }

    #[tokio::test]
    async fn test_session_is_checked_before_blacklists() {
        let f = fixture();
        let (session_id, token) = signed_in(&f).await;

        f.blacklist.blacklist_token(&token).await.unwrap();
        f.sessions.delete_session(&session_id).await.unwrap();

        assert_eq!(
            reason(f.gatekeeper.authenticate(Some(&token)).await),
            AuthFailure::SessionInvalid
        );
    }

    #[tokio::test]
    async fn test_store_outage_is_a_backend_error() {
        let cache: Arc<dyn CacheStore> = Arc::new(UnavailableStore);
        let tokens = TokenService::new("gate-secret");
        let sessions = SessionManager::new(Arc::clone(&cache));
        let gatekeeper = Gatekeeper::new(
            tokens.clone(),
            sessions.clone(),
            Blacklist::new(cache, sessions),
        );
        let user = User::new("a@x.com".into(), "hash".into(), "Alice".into());
        let token = tokens.issue_access_token(&user, "some-session").unwrap();

        assert!(matches!(
            gatekeeper.authenticate(Some(&token)).await,
            Err(GateError::Backend(CacheError::Timeout(_)))
        ));

        // Rejected before the store is consulted.
        assert_eq!(reason(gatekeeper.authenticate(None).await), AuthFailure::MissingCredentials);
        assert_eq!(
            reason(gatekeeper.authenticate(Some("not.a.jwt")).await),
            AuthFailure::InvalidToken
        );
    }
}
