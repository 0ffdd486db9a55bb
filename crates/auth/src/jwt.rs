//! HS256 token encoding/decoding behind a validator trait.
//!
//! Transports depend on [`JwtValidator`] so tests can substitute a stub and
//! the signing algorithm can change without touching handlers.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use meshmart_core::UserId;

use crate::{JwtClaims, Role, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature verification failed")]
    InvalidSignature,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Validates a compact JWT into [`JwtClaims`].
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// On-the-wire claim layout (numeric timestamps per RFC 7519).
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: i64,
    role: String,
    iat: i64,
    exp: i64,
}

/// HS256 validator/issuer over a shared secret.
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
        }
    }

    /// Encode claims into a signed compact token (used by tests/dev tooling;
    /// the marketplace itself does not mint user tokens).
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, JwtError> {
        let wire = WireClaims {
            sub: claims.sub.as_i64(),
            role: claims.role.as_str().to_string(),
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // Time-window checks are done by `validate_claims` against the
        // injected `now`, so the library's wall-clock checks are disabled.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let wire = decode::<WireClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Malformed(e.to_string()),
            }
        })?;

        let role: Role = wire
            .claims
            .role
            .parse()
            .map_err(|e: String| JwtError::Malformed(e))?;

        let issued_at = Utc
            .timestamp_opt(wire.claims.iat, 0)
            .single()
            .ok_or_else(|| JwtError::Malformed("iat out of range".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(wire.claims.exp, 0)
            .single()
            .ok_or_else(|| JwtError::Malformed("exp out of range".to_string()))?;

        let claims = JwtClaims {
            sub: UserId::new(wire.claims.sub),
            role,
            issued_at,
            expires_at,
        };
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}
