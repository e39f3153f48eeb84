//! Admin authentication for the queue backend.
//!
//! Provides:
//! - HS256 session token issuing and verification
//! - Password hashing with Argon2id
//! - Authentication context and error types

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const ADMIN_SCOPE: &str = "admin";

// ============================================================================
// Authentication Context
// ============================================================================

/// Captures the outcome of an authentication attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
    pub metadata: Value,
}

impl AuthContext {
    #[inline]
    pub fn new(subject: Option<String>, scopes: Vec<String>, metadata: Value) -> Self {
        Self {
            subject,
            scopes,
            metadata,
        }
    }

    /// Helper for anonymous requests.
    #[inline]
    pub fn anonymous() -> Self {
        Self::new(None, vec!["anonymous".into()], Value::Null)
    }

    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    #[inline]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.has_scope(ADMIN_SCOPE)
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Authentication errors that can surface during request processing.
#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token format")]
    InvalidTokenFormat,
    #[error("authentication subsystem is unavailable: {0}")]
    Subsystem(String),
}

/// Password-related errors.
#[derive(Debug, Error, Clone)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
    #[error("password verification failed")]
    VerificationFailed,
    #[error("invalid hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Authenticator Trait
// ============================================================================

/// Trait for authentication backends. Implement this for production and test authenticators.
#[async_trait::async_trait]
pub trait AuthenticatorTrait: Send + Sync + 'static {
    async fn authenticate(&self, token: Option<&str>) -> Result<AuthContext, AuthError>;
}

// ============================================================================
// Test Authenticator
// ============================================================================

/// Authenticator that ignores the token and returns fixed scopes.
#[derive(Debug, Default)]
pub struct TestAuthenticator {
    pub scopes: Vec<String>,
    pub subject: Option<String>,
}

impl TestAuthenticator {
    pub fn new_with(scopes: Vec<String>, subject: Option<String>) -> Self {
        Self { scopes, subject }
    }

    pub fn admin() -> Self {
        Self::new_with(vec![ADMIN_SCOPE.into()], Some("admin".into()))
    }

    pub fn anonymous() -> Self {
        Self::new_with(vec!["anonymous".into()], None)
    }
}

#[async_trait::async_trait]
impl AuthenticatorTrait for TestAuthenticator {
    async fn authenticate(&self, _token: Option<&str>) -> Result<AuthContext, AuthError> {
        Ok(AuthContext::new(
            self.subject.clone(),
            self.scopes.clone(),
            Value::Null,
        ))
    }
}

// ============================================================================
// JWT
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Option<String>,
    exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<u64>,
    /// Space-separated scope string (OAuth2 style)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scopes: Option<Vec<String>>,
}

/// HS256 token verifier.
#[derive(Debug, Clone)]
pub struct JwtAuthenticator {
    secret: String,
    /// Grace period in seconds for token expiration (default: 60)
    exp_grace_seconds: u64,
}

impl JwtAuthenticator {
    pub fn new_hs256(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            exp_grace_seconds: 60,
        }
    }

    fn process_claims(&self, claims: Claims) -> Result<AuthContext, AuthError> {
        let now = Utc::now().timestamp().max(0) as u64;
        if claims.exp < now.saturating_sub(self.exp_grace_seconds) {
            return Err(AuthError::TokenExpired);
        }

        let scopes = match (claims.scope, claims.scopes) {
            (Some(s), _) => s.split_whitespace().map(String::from).collect(),
            (_, Some(arr)) => arr,
            _ => Vec::new(),
        };

        Ok(AuthContext::new(claims.sub, scopes, Value::Null))
    }

    /// Strip the "Bearer " prefix from a token if present.
    #[inline]
    fn strip_bearer(token: &str) -> &str {
        let token = token.trim();
        if token.len() > 7 && token[..7].eq_ignore_ascii_case("bearer ") {
            &token[7..]
        } else {
            token
        }
    }
}

#[async_trait::async_trait]
impl AuthenticatorTrait for JwtAuthenticator {
    async fn authenticate(&self, token: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = match token {
            Some(t) if !t.trim().is_empty() => Self::strip_bearer(t),
            _ => return Ok(AuthContext::anonymous()),
        };

        let decoding = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false; // We handle exp manually for grace period
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &decoding, &validation)
            .map_err(|_| AuthError::AuthenticationFailed)?;

        self.process_claims(data.claims)
    }
}

/// A freshly minted session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints HS256 session tokens verifiable by [`JwtAuthenticator`] with the same secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str, scopes: &[&str]) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: expires_at.timestamp().max(0) as u64,
            iat: Some(now.timestamp().max(0) as u64),
            scope: None,
            scopes: Some(scopes.iter().map(|s| s.to_string()).collect()),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Subsystem(format!("failed to sign token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }
}

// ============================================================================
// Password Hashing
// ============================================================================

/// Password hasher using Argon2id.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        // OWASP recommended minimum parameters for Argon2id
        Self {
            m_cost: 19456,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure memory cost in KiB.
    pub fn with_memory_cost(mut self, kib: u32) -> Self {
        self.m_cost = kib;
        self
    }

    pub fn with_time_cost(mut self, iterations: u32) -> Self {
        self.t_cost = iterations;
        self
    }

    fn argon2(&self) -> Result<Argon2<'_>, PasswordError> {
        let params = argon2::Params::new(self.m_cost, self.t_cost, self.p_cost, None)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    /// Hash a password, returning the PHC-format hash string.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored PHC-format hash.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<(), PasswordError> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        self.argon2()?
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| PasswordError::VerificationFailed)
    }
}

/// Returns true when `input` parses as a PHC hash string.
#[inline]
pub fn is_phc_hash(input: &str) -> bool {
    PasswordHash::new(input).is_ok()
}

/// Hash a password using default Argon2id parameters.
#[inline]
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    Argon2Hasher::new().hash(password)
}

/// Verify a password against a stored hash using default parameters.
#[inline]
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), PasswordError> {
    Argon2Hasher::new().verify(password, stored_hash)
}

// ============================================================================
// Tests
// ============================================================================
