//! Access token minting and verification.
//!
//! Access tokens are HS256 JWTs carrying the identity id and an absolute
//! expiry. They are never persisted; validity is purely cryptographic and
//! temporal.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{AuthConfig, AuthError};

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity id).
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,
}

/// Stateless access token codec.
///
/// Holds pre-built signing keys derived from the configured secret. The
/// secret is injected through [`AuthConfig`] at construction time; callers
/// are expected to have run [`AuthConfig::validate`] first.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl AccessTokenCodec {
    /// Build a codec from validated config.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            ttl_secs: config.access_token_ttl_secs,
        }
    }

    /// Configured access token lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Mint an access token for the given identity with the default lifetime.
    pub fn mint(&self, subject: &str) -> Result<String, AuthError> {
        self.mint_with_ttl(subject, self.ttl_secs)
    }

    /// Mint an access token with an explicit lifetime in seconds.
    pub fn mint_with_ttl(&self, subject: &str, ttl_secs: i64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            exp: now + ttl_secs,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }

    /// Verify a token and return its claims.
    ///
    /// Fails closed: a bad signature, malformed structure, or past expiry
    /// yields an error, never partial claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            warn!("access token validation failed: {:?}", e.kind());
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        Ok(data.claims)
    }
}

impl std::fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys are secret material; show only the lifetime.
        f.debug_struct("AccessTokenCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> AccessTokenCodec {
        AccessTokenCodec::new(&AuthConfig::new(
            "test-secret-for-unit-tests-minimum-32-chars-long",
        ))
    }

    #[test]
    fn test_mint_and_verify() {
        let codec = test_codec();
        let token = codec.mint("usr_abc123").unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "usr_abc123");
        assert!(claims.exp > Utc::now().timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = test_codec();
        let token = codec.mint_with_ttl("usr_abc123", -5).unwrap();

        let err = codec.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let codec = test_codec();

        for garbage in ["", "not-a-jwt", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.e30."] {
            let err = codec.verify(garbage).unwrap_err();
            assert!(matches!(err, AuthError::InvalidToken), "{garbage:?}");
        }
    }

    #[test]
    fn test_wrong_key_rejected() {
        let codec = test_codec();
        let other = AccessTokenCodec::new(&AuthConfig::new(
            "a-different-secret-also-32-characters-long!!",
        ));

        let token = other.mint("usr_abc123").unwrap();
        let err = codec.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = test_codec();
        let token = codec.mint("usr_abc123").unwrap();

        // Flip a character in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload: Vec<char> = parts[1].chars().collect();
        let i = payload.len() / 2;
        payload[i] = if payload[i] == 'A' { 'B' } else { 'A' };
        parts[1] = payload.into_iter().collect();

        let err = codec.verify(&parts.join(".")).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let codec = test_codec();
        let debug = format!("{codec:?}");
        assert!(!debug.contains("test-secret"));
    }
}
