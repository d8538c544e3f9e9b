//! Session flow models.

use serde::{Deserialize, Serialize};

/// Access/refresh token pair returned by login, refresh, and the client
/// credentials flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer".
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}
