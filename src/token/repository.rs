//! Refresh token repository.
//!
//! Tokens are single-use: redemption atomically deactivates the presented
//! token and issues a replacement. A replayed token fails redemption, which
//! is the theft signal this scheme is built around.

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use crate::auth::AuthError;

use super::models::{RedeemOutcome, RefreshToken};

/// Refresh token lifetime.
const TOKEN_TTL_DAYS: i64 = 30;

/// Random bytes per token before encoding.
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Device descriptors are truncated to this many characters.
const DEVICE_INFO_MAX_CHARS: usize = 100;

const TOKEN_COLUMNS: &str =
    "id, token, user_id, expires_at, is_active, created_at, last_used_at, device_info";

/// Repository for refresh token operations.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new record ID.
    fn generate_id() -> String {
        format!("rtk_{}", nanoid::nanoid!(12))
    }

    /// Generate an opaque, URL-safe token string.
    fn generate_token() -> String {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Issue a new token for an identity.
    #[instrument(skip(self, device_info))]
    pub async fn issue(
        &self,
        user_id: &str,
        device_info: Option<&str>,
    ) -> Result<RefreshToken, AuthError> {
        let id = Self::generate_id();
        let token = Self::generate_token();
        let expires_at = (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let device_info =
            device_info.map(|d| d.chars().take(DEVICE_INFO_MAX_CHARS).collect::<String>());

        debug!("Issuing refresh token {} for user {}", id, user_id);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, token, user_id, expires_at, device_info)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&token)
        .bind(user_id)
        .bind(&expires_at)
        .bind(&device_info)
        .execute(&self.pool)
        .await
        .context("Failed to insert refresh token")?;

        self.get(&id)
            .await?
            .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("Refresh token not found after issue")))
    }

    /// Get a token record by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<RefreshToken>, AuthError> {
        let record = sqlx::query_as::<_, RefreshToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch refresh token")?;

        Ok(record)
    }

    /// Get a token record by its opaque string, in any state.
    #[instrument(skip(self, token))]
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthError> {
        let record = sqlx::query_as::<_, RefreshToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch refresh token by value")?;

        Ok(record)
    }

    /// Redeem a token, rotating it.
    ///
    /// Expiry is checked before the active flag, consistently with `sweep`.
    /// The deactivation runs as a compare-and-swap on `is_active`, so of two
    /// concurrent redemptions of the same string exactly one wins; the loser
    /// observes an already-rotated token.
    #[instrument(skip(self, token))]
    pub async fn redeem(&self, token: &str) -> Result<RedeemOutcome, AuthError> {
        let record = self
            .get_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if record.is_expired() {
            // Expired rows are garbage either way; drop this one now.
            sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
                .bind(&record.id)
                .execute(&self.pool)
                .await
                .context("Failed to delete expired refresh token")?;
            return Err(AuthError::TokenExpired);
        }

        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_active = 0,
                last_used_at = datetime('now')
            WHERE token = ? AND is_active = 1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .context("Failed to rotate refresh token")?;

        if result.rows_affected() == 0 {
            // Already rotated or revoked. A replay of a rotated token is the
            // theft signal; surface it in the log trail.
            warn!(token_id = %record.id, "Redemption of an inactive refresh token");
            return Err(AuthError::InvalidToken);
        }

        let replacement = self
            .issue(&record.user_id, record.device_info.as_deref())
            .await?;

        Ok(RedeemOutcome {
            user_id: record.user_id,
            replacement,
        })
    }

    /// Revoke one token by its opaque string. Idempotent: revoking an
    /// inactive or unknown token succeeds silently.
    #[instrument(skip(self, token))]
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_tokens SET is_active = 0 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Failed to revoke refresh token")?;

        Ok(())
    }

    /// Revoke one token by record ID, scoped to its owner.
    #[instrument(skip(self))]
    pub async fn revoke_by_id(&self, user_id: &str, token_id: &str) -> Result<(), AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_active = 0 WHERE id = ? AND user_id = ?",
        )
        .bind(token_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to revoke refresh token by id")?;

        if result.rows_affected() == 0 {
            return Err(AuthError::validation("Session not found"));
        }

        Ok(())
    }

    /// Revoke every active token owned by an identity. Returns the number
    /// of tokens that were active.
    #[instrument(skip(self))]
    pub async fn revoke_all(&self, user_id: &str) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_active = 0 WHERE user_id = ? AND is_active = 1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to revoke all refresh tokens")?;

        Ok(result.rows_affected())
    }

    /// Delete every expired token. Safe to run repeatedly and concurrently
    /// with redemptions.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await
            .context("Failed to sweep expired refresh tokens")?;

        Ok(result.rows_affected())
    }

    /// List an identity's active, unexpired tokens, newest first.
    #[instrument(skip(self))]
    pub async fn list_active(&self, user_id: &str) -> Result<Vec<RefreshToken>, AuthError> {
        let records = sqlx::query_as::<_, RefreshToken>(&format!(
            r#"
            SELECT {TOKEN_COLUMNS} FROM refresh_tokens
            WHERE user_id = ? AND is_active = 1 AND expires_at > datetime('now')
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list refresh tokens")?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::user::{CreateUserRequest, UserRepository};

    async fn setup() -> (RefreshTokenRepository, String) {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.pool().clone());
        let user = users
            .create(CreateUserRequest {
                email: "owner@example.com".to_string(),
                password: "$2b$04$test-hash".to_string(),
                full_name: None,
                role: None,
            })
            .await
            .unwrap();

        (RefreshTokenRepository::new(db.pool().clone()), user.id)
    }

    async fn force_expiry(repo: &RefreshTokenRepository, token_id: &str) {
        sqlx::query("UPDATE refresh_tokens SET expires_at = '2020-01-01 00:00:00' WHERE id = ?")
            .bind(token_id)
            .execute(&repo.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_issue_fields() {
        let (repo, user_id) = setup().await;

        let token = repo.issue(&user_id, Some("Firefox on Linux")).await.unwrap();
        assert!(token.id.starts_with("rtk_"));
        assert!(token.is_active);
        assert!(!token.is_expired());
        assert_eq!(token.user_id, user_id);
        assert_eq!(token.device_info.as_deref(), Some("Firefox on Linux"));
        // 32 bytes of entropy, URL-safe base64 without padding.
        assert_eq!(token.token.len(), 43);
        assert!(
            token
                .token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn test_issued_tokens_are_unique() {
        let (repo, user_id) = setup().await;

        let a = repo.issue(&user_id, None).await.unwrap();
        let b = repo.issue(&user_id, None).await.unwrap();
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn test_device_info_truncated() {
        let (repo, user_id) = setup().await;

        let long = "x".repeat(500);
        let token = repo.issue(&user_id, Some(&long)).await.unwrap();
        assert_eq!(token.device_info.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_redeem_rotates() {
        let (repo, user_id) = setup().await;
        let original = repo.issue(&user_id, Some("laptop")).await.unwrap();

        let outcome = repo.redeem(&original.token).await.unwrap();
        assert_eq!(outcome.user_id, user_id);
        assert_ne!(outcome.replacement.token, original.token);
        // Device descriptor carries over to the replacement.
        assert_eq!(outcome.replacement.device_info.as_deref(), Some("laptop"));

        // The presented token is now inactive with a usage stamp.
        let old = repo.get(&original.id).await.unwrap().unwrap();
        assert!(!old.is_active);
        assert!(old.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let (repo, user_id) = setup().await;
        let original = repo.issue(&user_id, None).await.unwrap();

        repo.redeem(&original.token).await.unwrap();

        let err = repo.redeem(&original.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_redeem_unknown_token() {
        let (repo, _) = setup().await;

        let err = repo.redeem("no-such-token").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_redeem_expired_token_removes_it() {
        let (repo, user_id) = setup().await;
        let token = repo.issue(&user_id, None).await.unwrap();
        force_expiry(&repo, &token.id).await;

        let err = repo.redeem(&token.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
        assert!(repo.get(&token.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (repo, user_id) = setup().await;
        let token = repo.issue(&user_id, None).await.unwrap();

        repo.revoke(&token.token).await.unwrap();
        repo.revoke(&token.token).await.unwrap();
        repo.revoke("never-existed").await.unwrap();

        let err = repo.redeem(&token.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_revoke_by_id_scoped_to_owner() {
        let (repo, user_id) = setup().await;
        let token = repo.issue(&user_id, None).await.unwrap();

        let err = repo
            .revoke_by_id("usr_someone_else", &token.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        repo.revoke_by_id(&user_id, &token.id).await.unwrap();
        assert!(!repo.get(&token.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_revoke_all_counts_active_only() {
        let (repo, user_id) = setup().await;

        let a = repo.issue(&user_id, None).await.unwrap();
        repo.issue(&user_id, None).await.unwrap();
        repo.issue(&user_id, None).await.unwrap();
        repo.revoke(&a.token).await.unwrap();

        assert_eq!(repo.revoke_all(&user_id).await.unwrap(), 2);
        assert_eq!(repo.revoke_all(&user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (repo, user_id) = setup().await;

        let stale = repo.issue(&user_id, None).await.unwrap();
        let fresh = repo.issue(&user_id, None).await.unwrap();
        force_expiry(&repo, &stale.id).await;

        assert_eq!(repo.sweep().await.unwrap(), 1);
        assert!(repo.get(&stale.id).await.unwrap().is_none());
        assert!(repo.get(&fresh.id).await.unwrap().is_some());

        // Repeat runs are harmless.
        assert_eq!(repo.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_active_excludes_unusable() {
        let (repo, user_id) = setup().await;

        let revoked = repo.issue(&user_id, Some("old phone")).await.unwrap();
        let expired = repo.issue(&user_id, None).await.unwrap();
        let live = repo.issue(&user_id, Some("laptop")).await.unwrap();

        repo.revoke(&revoked.token).await.unwrap();
        force_expiry(&repo, &expired.id).await;

        let active = repo.list_active(&user_id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, live.id);
    }
}
