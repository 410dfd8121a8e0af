// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Bearer-token sessions and password hashing.

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::api::AppState;
use crate::config::{AuthConfig, MAX_SESSION_TTL_HOURS};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Signs and checks session tokens
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    /// `ttl_hours` is clamped to `MAX_SESSION_TTL_HOURS` either way
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let ttl_hours = ttl_hours.clamp(-MAX_SESSION_TTL_HOURS, MAX_SESSION_TTL_HOURS);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.session_secret, config.session_ttl_hours)
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| anyhow!("Session expiry out of range"))?
                .timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to sign session token: {}", e))
    }

    /// The user id carried by a valid, unexpired token
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Uuid::parse_str(&data.claims.sub).ok(),
            Err(e) => {
                debug!("Rejected session token: {}", e);
                None
            }
        }
    }
}

/// The signed-in user. Use `Option<AuthSession>` where a session is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: Uuid,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(parts).ok_or(AppError::Unauthenticated)?;
        let user_id = state
            .sessions
            .verify(token)
            .ok_or(AppError::Unauthenticated)?;
        Ok(AuthSession { user_id })
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

/// False for a wrong password or an unreadable hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            debug!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        let keys = SessionKeys::new("test-secret", 1);
        let user = Uuid::new_v4();
        let token = keys.issue(user).unwrap();
        assert_eq!(keys.verify(&token), Some(user));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = SessionKeys::new("one", 1).issue(Uuid::new_v4()).unwrap();
        assert_eq!(SessionKeys::new("two", 1).verify(&token), None);
        assert_eq!(SessionKeys::new("one", 1).verify("garbage"), None);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = SessionKeys::new("test-secret", -2);
        let token = keys.issue(Uuid::new_v4()).unwrap();
        assert_eq!(keys.verify(&token), None);
    }

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("Sup3r$ecret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Sup3r$ecret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("Sup3r$ecret", "not-a-hash"));
    }

    #[test]
    fn oversized_ttls_are_clamped() {
        let keys = SessionKeys::new("test-secret", i64::MAX);
        let user = Uuid::new_v4();
        let token = keys.issue(user).unwrap();
        assert_eq!(keys.verify(&token), Some(user));

        let keys = SessionKeys::new("test-secret", i64::MIN);
        let token = keys.issue(user).unwrap();
        assert_eq!(keys.verify(&token), None);
    }
}
