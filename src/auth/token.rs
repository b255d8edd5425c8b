use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("{0:?} is not an HMAC algorithm")]
    UnsupportedAlgorithm(Algorithm),
    #[error("token signed with unexpected algorithm {0:?}")]
    UnexpectedAlgorithm(Algorithm),
    #[error("expected a {0:?} token")]
    WrongType(TokenType),
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

/// Signs and verifies access and refresh tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self::build(secret, Algorithm::HS256)
    }

    pub fn with_algorithm(secret: &str, algorithm: Algorithm) -> Result<Self, TokenError> {
        if !is_hmac(algorithm) {
            return Err(TokenError::UnsupportedAlgorithm(algorithm));
        }
        Ok(Self::build(secret, algorithm))
    }

    fn build(secret: &str, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue_access_token(&self, user: &User, session_id: &str) -> Result<String, TokenError> {
        self.issue(user, session_id, TokenType::Access, ACCESS_TOKEN_TTL)
    }

    pub fn issue_refresh_token(&self, user: &User, session_id: &str) -> Result<String, TokenError> {
        self.issue(user, session_id, TokenType::Refresh, REFRESH_TOKEN_TTL)
    }

    fn issue(
        &self,
        user: &User,
        session_id: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        self.sign(&Claims {
            user_id: user.id,
            email: user.email.clone(),
            session_id: session_id.to_string(),
            token_type,
            exp: expires_at,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(
            &Header::new(self.algorithm),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Checks algorithm, signature, expiry and claim shape.
    ///
    /// The header algorithm is compared against the configured one before
    /// anything else is trusted.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token)?;
        if !is_hmac(header.alg) || header.alg != self.algorithm {
            return Err(TokenError::UnexpectedAlgorithm(header.alg));
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    pub fn verify_as(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.token_type != expected {
            return Err(TokenError::WrongType(expected));
        }
        Ok(claims)
    }
}
