pub mod guard;
pub mod session;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::config::AuthConfig;

pub use guard::{AdminGuard, GuardStatus, Navigator};
pub use session::{Principal, RoleResolver, SessionContext, SessionState};

/// The only claims read from an access token.
///
/// Role and tenant claims may be present in the token but are ignored; the
/// role-mapping table is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing JWT secret")]
    InvalidSecret,

    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

/// An authenticated session as held by the authentication client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub principal_id: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication client seam.
///
/// `watch` yields `None` when signed out and a new value on every sign-in and
/// token refresh.
pub trait AuthProvider: Send + Sync {
    /// Current session, read at call time
    fn session(&self) -> Option<AuthSession>;

    fn watch(&self) -> watch::Receiver<Option<AuthSession>>;

    fn sign_out(&self);
}

/// `AuthProvider` fed with bearer tokens issued by the hosted auth service
pub struct TokenAuth {
    config: AuthConfig,
    sender: watch::Sender<Option<AuthSession>>,
}

impl TokenAuth {
    pub fn new(config: AuthConfig) -> Self {
        let (sender, _) = watch::channel(None);
        Self { config, sender }
    }

    /// Verify and adopt a token; used for both sign-in and refresh
    pub fn sign_in(&self, access_token: &str) -> Result<AuthSession, AuthError> {
        let claims = decode_access_token(access_token, &self.config)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("exp out of range".to_string()))?;
        let session = AuthSession {
            principal_id: claims.sub,
            access_token: access_token.to_string(),
            expires_at,
        };
        self.sender.send_replace(Some(session.clone()));
        Ok(session)
    }
}

impl AuthProvider for TokenAuth {
    fn session(&self) -> Option<AuthSession> {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<AuthSession>> {
        self.sender.subscribe()
    }

    fn sign_out(&self) {
        self.sender.send_replace(None);
    }
}

pub fn decode_access_token(token: &str, config: &AuthConfig) -> Result<AccessClaims, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = config.leeway_secs;
    // Hosted auth sets an audience we do not check
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Mint an access token for `principal_id`
pub fn generate_access_token(principal_id: &str, ttl: Duration, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    let claims = AccessClaims {
        sub: principal_id.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}
