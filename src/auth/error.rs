//! Authentication errors.

use thiserror::Error;

/// Authentication and authorization errors.
///
/// Display strings are safe to show to the end user. Credential and token
/// failures deliberately carry generic messages: the caller must not be able
/// to tell an unknown account from a wrong password, or a revoked token from
/// one that never existed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password failed the length policy.
    #[error("{0}")]
    PasswordPolicy(String),

    /// Malformed input or a forbidden state change.
    #[error("{0}")]
    Validation(String),

    /// Bad email/password pair.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// Bad client id/secret pair, or an unusable client record.
    #[error("invalid client credentials")]
    InvalidClientCredentials,

    /// Unknown, revoked, or already-rotated token.
    #[error("invalid token")]
    InvalidToken,

    /// Token past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Authenticated identity with insufficient role rank.
    #[error("insufficient privileges")]
    InsufficientRole,

    /// Authenticated identity flagged inactive.
    #[error("account is inactive")]
    AccountInactive,

    /// Store or subsystem failure. The underlying error is kept for logging
    /// and never shown to the user.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

/// Coarse error class, used by callers to pick the response signal
/// (400 / 401 / 403 / 500 in an HTTP frontend).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Unauthorized,
    Forbidden,
    Internal,
}

impl AuthError {
    /// Classify this error per the response taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PasswordPolicy(_) | Self::Validation(_) => ErrorClass::Validation,
            Self::InvalidCredentials
            | Self::InvalidClientCredentials
            | Self::InvalidToken
            | Self::TokenExpired => ErrorClass::Unauthorized,
            Self::InsufficientRole | Self::AccountInactive => ErrorClass::Forbidden,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
