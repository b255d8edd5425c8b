use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::blacklist::Blacklist;
use super::gatekeeper::AuthContext;
use super::session::{Session, SessionError, SessionManager};
use super::token::{ACCESS_TOKEN_TTL, TokenError, TokenService, TokenType};
use crate::cache::CacheError;
use crate::database::{RepoError, UserRepository};
use crate::models::User;
use crate::utils::{hash_password, verify_password};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Peer details recorded on the session at login.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub is_current: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub active_sessions: Vec<SessionInfo>,
    pub total_sessions: usize,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: SessionManager,
    tokens: TokenService,
    blacklist: Blacklist,
    session_duration: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: SessionManager,
        tokens: TokenService,
        blacklist: Blacklist,
        session_duration: Duration,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            blacklist,
            session_duration,
            bcrypt_cost,
        }
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        match self.users.get_by_email(email).await {
            Ok(_) => return Err(AuthError::EmailTaken),
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = hash_password(password, self.bcrypt_cost)?;
        let user = User::new(email.to_string(), password_hash, name.to_string());

        self.users.create(&user).await.map_err(|e| match e {
            RepoError::Conflict => AuthError::EmailTaken,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Unknown email and wrong password fail the same way.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<LoginResponse, AuthError> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self
            .sessions
            .create_session(
                user.id,
                &user.email,
                &client.ip_address,
                &client.user_agent,
                self.session_duration,
            )
            .await?;

        let access_token = self.tokens.issue_access_token(&user, &session.id)?;
        let refresh_token = self.tokens.issue_refresh_token(&user, &session.id)?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "User logged in");
        Ok(LoginResponse {
            access_token,
            refresh_token,
            user,
            expires_in: ACCESS_TOKEN_TTL.as_secs(),
        })
    }

    /// Exchanges a refresh token for a new pair bound to the same session and
    /// extends that session.
    pub async fn refresh(
        &self,
        ctx: &AuthContext,
        refresh_token: &str,
    ) -> Result<RefreshResponse, AuthError> {
        let claims = self
            .tokens
            .verify_as(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;

        if claims.user_id != ctx.user_id {
            return Err(AuthError::InvalidRefreshToken);
        }
        if !self.sessions.is_session_valid(&claims.session_id).await? {
            return Err(AuthError::InvalidRefreshToken);
        }
        if self.blacklist.is_token_blacklisted(refresh_token).await?
            || self
                .blacklist
                .is_user_session_blacklisted(claims.user_id, &claims.session_id)
                .await?
        {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = match self.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(AuthError::InvalidRefreshToken),
            Err(e) => return Err(e.into()),
        };

        let access_token = self.tokens.issue_access_token(&user, &claims.session_id)?;
        let refresh_token = self.tokens.issue_refresh_token(&user, &claims.session_id)?;
        self.sessions
            .refresh_session(&claims.session_id, self.session_duration)
            .await?;

        Ok(RefreshResponse {
            access_token,
            refresh_token,
            expires_in: ACCESS_TOKEN_TTL.as_secs(),
        })
    }

    /// Revokes the presented token, then ends its session. Both writes must
    /// land for the logout to count.
    pub async fn logout(&self, ctx: &AuthContext) -> Result<(), AuthError> {
        self.blacklist.blacklist_token(&ctx.token).await?;
        self.sessions.delete_session(&ctx.session_id).await?;

        tracing::info!(user_id = %ctx.user_id, session_id = %ctx.session_id, "User logged out");
        Ok(())
    }

    pub async fn logout_all(&self, user_id: Uuid) -> Result<usize, AuthError> {
        let revoked = self.blacklist.blacklist_all_user_sessions(user_id).await?;
        self.sessions.delete_user_sessions(user_id).await?;

        tracing::info!(%user_id, sessions = revoked.len(), "User logged out everywhere");
        Ok(revoked.len())
    }

    pub async fn sessions(&self, ctx: &AuthContext) -> Result<SessionsResponse, AuthError> {
        let active_sessions: Vec<SessionInfo> = self
            .sessions
            .list_active_sessions(ctx.user_id)
            .await?
            .into_iter()
            .map(|session: Session| SessionInfo {
                is_current: session.id == ctx.session_id,
                id: session.id,
                ip_address: session.ip_address,
                user_agent: session.user_agent,
                created_at: session.created_at,
                expires_at: session.expires_at,
            })
            .collect();

        Ok(SessionsResponse {
            total_sessions: active_sessions.len(),
            active_sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::gatekeeper::{AuthFailure, GateError, Gatekeeper};
    use crate::auth::blacklist::BLACKLIST_TTL;
    use crate::cache::{CacheStore, MemoryStore, UnavailableStore};
    use crate::database::MemoryUserRepository;

    const PASSWORD: &str = "Aa1!aaaa";

    fn services_with(cache: Arc<dyn CacheStore>) -> (AuthService, Gatekeeper, Blacklist) {
        let sessions = SessionManager::new(Arc::clone(&cache));
        let tokens = TokenService::new("service-secret");
        let blacklist = Blacklist::new(cache, sessions.clone());
        let auth = AuthService::new(
            Arc::new(MemoryUserRepository::new()),
            sessions.clone(),
            tokens.clone(),
            blacklist.clone(),
            Duration::from_secs(24 * 60 * 60),
            4,
        );
        (auth, Gatekeeper::new(tokens, sessions, blacklist.clone()), blacklist)
    }

    fn services() -> (AuthService, Gatekeeper) {
        let (auth, gate, _) = services_with(Arc::new(MemoryStore::new()));
        (auth, gate)
    }

    async fn logged_in(auth: &AuthService, gate: &Gatekeeper) -> (LoginResponse, AuthContext) {
        let login = auth
            .login("a@x.com", PASSWORD, &ClientInfo::default())
            .await
            .unwrap();
        let ctx = gate.authenticate(Some(&login.access_token)).await.unwrap();
        (login, ctx)
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let (auth, _) = services();
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();

        assert!(matches!(
            auth.register("a@x.com", PASSWORD, "Alice").await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_bad_credentials_look_the_same() {
        let (auth, _) = services();
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();

        let unknown = auth.login("b@x.com", PASSWORD, &ClientInfo::default()).await;
        let wrong = auth.login("a@x.com", "Bb2@bbbb", &ClientInfo::default()).await;

        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_logout_revokes_access_token() {
        let (auth, gate) = services();
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();
        let (login, ctx) = logged_in(&auth, &gate).await;

        auth.logout(&ctx).await.unwrap();

        let result = gate.authenticate(Some(&login.access_token)).await;
        assert!(matches!(result, Err(GateError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_refresh_issues_working_tokens() {
        let (auth, gate) = services();
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();
        let (login, ctx) = logged_in(&auth, &gate).await;

        let refreshed = auth.refresh(&ctx, &login.refresh_token).await.unwrap();

        let again = gate.authenticate(Some(&refreshed.access_token)).await.unwrap();
        assert_eq!(again.session_id, ctx.session_id);
        assert_eq!(refreshed.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let (auth, gate) = services();
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();
        let (login, ctx) = logged_in(&auth, &gate).await;

        assert!(matches!(
            auth.refresh(&ctx, &login.access_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_all_ends_every_device() {
        let (auth, gate) = services();
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();
        let (first, ctx) = logged_in(&auth, &gate).await;
        let (second, _) = logged_in(&auth, &gate).await;

        assert_eq!(auth.sessions(&ctx).await.unwrap().total_sessions, 2);
        assert_eq!(auth.logout_all(ctx.user_id).await.unwrap(), 2);

        for token in [&first.access_token, &second.access_token] {
            assert!(matches!(
                gate.authenticate(Some(token)).await,
                Err(GateError::Unauthorized(AuthFailure::SessionInvalid))
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_session_blocks_refresh_after_blacklist_lapses() {
        let (auth, gate, blacklist) = services_with(Arc::new(MemoryStore::new()));
        auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();
        let (single, single_ctx) = logged_in(&auth, &gate).await;
        let (everywhere, everywhere_ctx) = logged_in(&auth, &gate).await;

        auth.logout(&single_ctx).await.unwrap();
        auth.logout_all(everywhere_ctx.user_id).await.unwrap();

        tokio::time::advance(BLACKLIST_TTL + Duration::from_secs(1)).await;

        // Revocation flags are gone, yet the 7 day refresh tokens stay dead
        // because their sessions no longer exist.
        assert!(!blacklist.is_token_blacklisted(&single.access_token).await.unwrap());
        assert!(
            !blacklist
                .is_user_session_blacklisted(everywhere_ctx.user_id, &everywhere_ctx.session_id)
                .await
                .unwrap()
        );
        for (login, ctx) in [(&single, &single_ctx), (&everywhere, &everywhere_ctx)] {
            assert!(matches!(
                auth.refresh(ctx, &login.refresh_token).await,
                Err(AuthError::InvalidRefreshToken)
            ));
        }
    }

    #[tokio::test]
    async fn test_cache_outage_fails_login_and_logout() {
        let (auth, _, _) = services_with(Arc::new(UnavailableStore));
        let user = auth.register("a@x.com", PASSWORD, "Alice").await.unwrap();

        assert!(matches!(
            auth.login("a@x.com", PASSWORD, &ClientInfo::default()).await,
            Err(AuthError::Session(SessionError::Cache(CacheError::Timeout(_))))
        ));

        let ctx = AuthContext {
            user_id: user.id,
            email: user.email.clone(),
            session_id: "some-session".into(),
            token: "some-token".into(),
        };
        assert!(matches!(
            auth.logout(&ctx).await,
            Err(AuthError::Cache(CacheError::Timeout(_)))
        ));
        assert!(auth.logout_all(user.id).await.is_err());
    }
}
