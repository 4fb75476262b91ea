//! HS256 session tokens.
//!
//! Claim-window validation is deterministic (caller supplies `now`), which
//! keeps it trivially testable; signature verification is jsonwebtoken's.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use atrium_core::{RoleId, UserId};

use crate::account::UserAccount;

/// Claims carried by a portal session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,
    pub document: String,
    pub role_id: RoleId,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiration, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("token is invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues session tokens. `remember` trades the standard lifetime for the
/// extended one.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: Vec<u8>,
    standard_ttl: Duration,
    remember_ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            standard_ttl: Duration::hours(12),
            remember_ttl: Duration::days(30),
        }
    }

    pub fn issue(
        &self,
        user: &UserAccount,
        remember: bool,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let ttl = if remember {
            self.remember_ttl
        } else {
            self.standard_ttl
        };
        let expires_at = now + ttl;

        let claims = SessionClaims {
            sub: user.id,
            document: user.document_number.clone(),
            role_id: user.role_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| SessionError::Encoding(e.to_string()))?;

        Ok(IssuedSession { token, expires_at })
    }
}

/// Validates bearer tokens at the HTTP boundary.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError>;
}

pub struct Hs256TokenValidator {
    secret: Vec<u8>,
}

impl Hs256TokenValidator {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenValidator for Hs256TokenValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked deterministically below.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|_| SessionError::Invalid)?;

        let claims = data.claims;
        if claims.exp <= claims.iat {
            return Err(SessionError::Invalid);
        }
        if now.timestamp() < claims.iat {
            return Err(SessionError::NotYetValid);
        }
        if now.timestamp() >= claims.exp {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::RoleId;

    fn user() -> UserAccount {
        UserAccount::new("1017234", "hash".to_string(), RoleId::new())
    }

    #[test]
    fn issue_then_validate_round_trip() {
        let issuer = SessionIssuer::new("secret");
        let validator = Hs256TokenValidator::new("secret");
        let user = user();
        let now = Utc::now();

        let session = issuer.issue(&user, false, now).unwrap();
        let claims = validator.validate(&session.token, now).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role_id, user.role_id);
        assert_eq!(claims.document, "1017234");
    }

    #[test]
    fn remember_extends_the_lifetime() {
        let issuer = SessionIssuer::new("secret");
        let user = user();
        let now = Utc::now();

        let short = issuer.issue(&user, false, now).unwrap();
        let long = issuer.issue(&user, true, now).unwrap();
        assert!(long.expires_at > short.expires_at);
    }

    #[test]
    fn expired_token_rejected() {
        let issuer = SessionIssuer::new("secret");
        let validator = Hs256TokenValidator::new("secret");
        let user = user();
        let issued_at = Utc::now() - Duration::days(31);

        let session = issuer.issue(&user, false, issued_at).unwrap();
        assert_eq!(
            validator.validate(&session.token, Utc::now()),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn wrong_secret_rejected() {
        let issuer = SessionIssuer::new("secret");
        let validator = Hs256TokenValidator::new("other");
        let user = user();
        let now = Utc::now();

        let session = issuer.issue(&user, false, now).unwrap();
        assert_eq!(
            validator.validate(&session.token, now),
            Err(SessionError::Invalid)
        );
    }
}
