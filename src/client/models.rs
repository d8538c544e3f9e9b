//! OAuth2 client credential models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A machine client's credential pair, bound to one identity.
///
/// The secret is stored and compared verbatim so it can be re-displayed to
/// its owner through the credential listing; it is a provisioned API
/// credential, not a user-chosen password.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OAuth2Client {
    /// Unique record identifier.
    pub id: String,
    /// Public client identifier.
    pub client_id: String,
    /// Shared secret.
    pub client_secret: String,
    /// Owning identity.
    pub user_id: String,
    /// Usable while true.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last successful authentication timestamp.
    pub last_used_at: Option<String>,
    /// Optional absolute expiry.
    pub expires_at: Option<String>,
}

impl OAuth2Client {
    /// Check if this client is past its expiry, if it has one.
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = &self.expires_at {
            if let Ok(expiry) = chrono::DateTime::parse_from_rfc3339(expires_at) {
                return expiry < chrono::Utc::now();
            }
            if let Ok(expiry) = chrono::NaiveDateTime::parse_from_str(expires_at, "%Y-%m-%d %H:%M:%S")
            {
                return expiry.and_utc() < chrono::Utc::now();
            }
        }
        false
    }
}
