//! JWT issuance and verification for access and refresh tokens.
//!
//! Access tokens carry the user id and are signed with the access secret;
//! refresh tokens carry only the session id and are signed with a distinct
//! secret. Which secret applies is decided by which verification path the
//! caller invokes.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Audience claim required on access tokens.
pub const AUDIENCE: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: String,
    pub session_id: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub session_id: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret().as_bytes(),
            config.jwt_refresh_secret().as_bytes(),
            (config.auth.access_token_minutes * 60) as i64,
            (config.auth.refresh_token_days * 86400) as i64,
        )
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Issue a short-lived access token bound to a user and session.
    pub fn issue_access(&self, user_id: &str, session_id: &str) -> AppResult<String> {
        let now = now_secs();
        let claims = AccessClaims {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Issue a long-lived refresh token bound to a session only. Identity is
    /// resolved by exchanging it against the session store.
    pub fn issue_refresh(&self, session_id: &str) -> AppResult<String> {
        let now = now_secs();
        let claims = RefreshClaims {
            session_id: session_id.to_string(),
            aud: AUDIENCE.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {}", e)))
    }

    /// Verify an access token. Requires the "user" audience claim.
    /// Missing, malformed, expired, and signature-invalid tokens all fail
    /// identically.
    pub fn verify_access(&self, token: &str) -> AppResult<AccessClaims> {
        let mut validation = Validation::default();
        validation.set_audience(&[AUDIENCE]);

        jsonwebtoken::decode::<AccessClaims>(token, &self.access_decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }

    /// Verify a refresh token against the refresh secret.
    pub fn verify_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        let mut validation = Validation::default();
        validation.set_audience(&[AUDIENCE]);

        jsonwebtoken::decode::<RefreshClaims>(token, &self.refresh_decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
