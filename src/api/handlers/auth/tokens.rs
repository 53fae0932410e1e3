//! Signed bearer tokens: short-lived access tokens and long-lived refresh
//! tokens, each with its own HMAC secret.
//!
//! Access tokens are verified statelessly (signature + expiry). Refresh
//! tokens are additionally pinned server-side: only the SHA-256 fingerprint
//! of the currently valid refresh token is persisted on the user row, so a
//! rotated-out token is detectable even before it expires.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::state::AuthConfig;

/// The two token classes this service mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity id.
    pub sub: Uuid,
    /// Token class, checked on verification so one kind cannot stand in for
    /// the other.
    pub kind: TokenKind,
    /// Issued-at (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

/// Process-wide signing configuration, built once at startup and never
/// mutated afterwards. Rotating a secret invalidates all outstanding tokens
/// of that kind.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let access_secret = config.access_token_secret().expose_secret().as_bytes();
        let refresh_secret = config.refresh_token_secret().expose_secret().as_bytes();

        Self {
            access: KeyPair {
                encoding: EncodingKey::from_secret(access_secret),
                decoding: DecodingKey::from_secret(access_secret),
                ttl_secs: config.access_token_ttl_secs(),
            },
            refresh: KeyPair {
                encoding: EncodingKey::from_secret(refresh_secret),
                decoding: DecodingKey::from_secret(refresh_secret),
                ttl_secs: config.refresh_token_ttl_secs(),
            },
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Mint a signed token of the given kind for `user_id`.
    ///
    /// # Errors
    /// Fails only on a signing subsystem failure.
    pub fn issue(&self, kind: TokenKind, user_id: Uuid) -> Result<String, TokenError> {
        let keys = self.keys(kind);
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: user_id,
            kind,
            iat: now,
            exp: now + keys.ttl_secs,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &keys.encoding).map_err(TokenError::Signing)
    }

    /// Verify a token against the expected kind and return its claims.
    ///
    /// # Errors
    /// `Expired` for a valid-but-stale token, `Invalid` for everything else
    /// (bad signature, malformed token, kind mismatch).
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let keys = self.keys(expected);
        let data = decode::<Claims>(token, &keys.decoding, &Validation::default()).map_err(
            |err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        if data.claims.kind != expected {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }
}

/// SHA-256 hex fingerprint of a refresh token.
///
/// Only this digest is persisted, so a database leak does not hand out
/// usable refresh tokens.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
