//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the token signing secret.
pub const SECRET_KEY_ENV: &str = "TURNKEY_SECRET_KEY";

/// Placeholder secret shipped in old deployment templates. Refusing it at
/// startup is part of the config contract.
const PLACEHOLDER_SECRET: &str = "change_this_secret_in_prod";

/// Minimum signing secret length in characters.
const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret for access tokens. REQUIRED.
    pub secret_key: String,

    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default secret - must be explicitly configured
            secret_key: String::new(),
            access_token_ttl_secs: 3600,
        }
    }
}

impl AuthConfig {
    /// Build a config with the given secret and default token lifetimes.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    /// Load the config from the environment.
    ///
    /// Reads the signing secret from `TURNKEY_SECRET_KEY` and validates it,
    /// so a process using this constructor fails fast on a missing or weak
    /// secret.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        let secret_key =
            std::env::var(SECRET_KEY_ENV).map_err(|_| ConfigValidationError::MissingSecret)?;

        let config = Self::new(secret_key);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// The signing secret must be present, at least 32 characters, and not
    /// the known placeholder value. Callers must treat a failure as fatal
    /// and refuse to serve.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.secret_key.is_empty() {
            return Err(ConfigValidationError::MissingSecret);
        }

        if self.secret_key == PLACEHOLDER_SECRET {
            return Err(ConfigValidationError::PlaceholderSecret);
        }

        if self.secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigValidationError::SecretTooShort);
        }

        if self.access_token_ttl_secs <= 0 {
            return Err(ConfigValidationError::InvalidTokenTtl);
        }

        Ok(())
    }

    /// Generate a secure random signing secret using cryptographically
    /// secure RNG.
    pub fn generate_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error(
        "signing secret is required. Set the {SECRET_KEY_ENV} environment variable or secret_key in config."
    )]
    MissingSecret,

    #[error("signing secret cannot be the placeholder value. Configure a real secret.")]
    PlaceholderSecret,

    #[error("signing secret must be at least {MIN_SECRET_LEN} characters long.")]
    SecretTooShort,

    #[error("access token lifetime must be positive.")]
    InvalidTokenTtl,
}
