//! Signed, time-bounded access and refresh tokens (HS256).

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use gatehouse_core::DomainError;

use crate::claims::{ClaimsSeed, TokenClaims, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("the token is invalid")]
    Invalid,

    #[error("token is expired")]
    Expired,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::InvalidSignature
            | JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::InvalidAlgorithmName
            | JwtErrorKind::ImmatureSignature => TokenError::Invalid,
            JwtErrorKind::InvalidToken
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_)
            | JwtErrorKind::MissingRequiredClaim(_) => TokenError::Malformed(err.to_string()),
            _ => TokenError::Invalid,
        }
    }
}

/// Process-wide symmetric signing secret.
///
/// Loaded once at startup; an empty secret is refused so a misconfigured
/// process fails to start instead of minting forgeable tokens.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, DomainError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DomainError::validation("signing secret must not be empty"));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Lifetimes of the two token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    /// Lifetime of the identity-bearing access token.
    pub access: Duration,
    /// Lifetime of the identity-free refresh token.
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::hours(160),
        }
    }
}

/// A freshly signed access/refresh pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Signed access token (identity claims, `iat`, `exp`).
    pub access: String,
    /// Signed refresh token (`exp` only).
    pub refresh: String,
}

impl core::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

/// Issues and validates tokens with a single injected secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TokenTtl,
}

impl TokenService {
    pub fn new(secret: &SigningSecret) -> Self {
        Self::with_ttl(secret, TokenTtl::default())
    }

    pub fn with_ttl(secret: &SigningSecret, ttl: TokenTtl) -> Self {
        // Expiry is checked by `validate_claims` against the caller's clock,
        // strictly and with zero leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> TokenTtl {
        self.ttl
    }

    /// Mint an access token carrying `seed` and an identity-free refresh token.
    pub fn issue_pair(&self, seed: &ClaimsSeed, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        let issued_at = now.timestamp();
        let expiry = |ttl: Duration| {
            now.checked_add_signed(ttl)
                .map(|t| t.timestamp())
                .ok_or(TokenError::InvalidTimeWindow)
        };
        let access_exp = expiry(self.ttl.access)?;
        let refresh_exp = expiry(self.ttl.refresh)?;
        if access_exp <= issued_at || refresh_exp <= issued_at {
            return Err(TokenError::InvalidTimeWindow);
        }

        let access = self.sign(&seed.access_claims(issued_at, access_exp))?;
        let refresh = self.sign(&TokenClaims::expiry_only(refresh_exp))?;
        Ok(TokenPair { access, refresh })
    }

    /// Sign arbitrary claims with the service secret.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the decoded claims.
    ///
    /// Malformed input is reported as an error value, never a panic.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
