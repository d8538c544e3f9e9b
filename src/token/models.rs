//! Refresh token models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted refresh token record.
///
/// The token string itself is secret material and is skipped when
/// serializing; clients only ever see it once, inside the pair returned by
/// login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    /// Unique record identifier.
    pub id: String,
    /// The opaque token string.
    #[serde(skip_serializing)]
    pub token: String,
    /// Owning identity.
    pub user_id: String,
    /// Absolute expiry timestamp.
    pub expires_at: String,
    /// Usable while true; rotation and revocation flip it off permanently.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last redemption timestamp.
    pub last_used_at: Option<String>,
    /// Optional device or client descriptor.
    pub device_info: Option<String>,
}

impl RefreshToken {
    /// Check if this token is past its expiry.
    pub fn is_expired(&self) -> bool {
        if let Ok(expiry) = chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            return expiry < chrono::Utc::now();
        }
        if let Ok(expiry) =
            chrono::NaiveDateTime::parse_from_str(&self.expires_at, "%Y-%m-%d %H:%M:%S")
        {
            return expiry.and_utc() < chrono::Utc::now();
        }
        false
    }
}

/// Public session view for self-service listing. Carries no token string.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshTokenInfo {
    pub id: String,
    pub device_info: Option<String>,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub expires_at: String,
}

impl From<RefreshToken> for RefreshTokenInfo {
    fn from(token: RefreshToken) -> Self {
        Self {
            id: token.id,
            device_info: token.device_info,
            created_at: token.created_at,
            last_used_at: token.last_used_at,
            expires_at: token.expires_at,
        }
    }
}

/// Result of a successful redemption: the resolved identity plus the
/// replacement token minted by rotation.
#[derive(Debug)]
pub struct RedeemOutcome {
    pub user_id: String,
    pub replacement: RefreshToken,
}
