//! OAuth2 client credential repository.

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::auth::AuthError;

use super::models::OAuth2Client;

/// Public identifier prefix.
const CLIENT_ID_PREFIX: &str = "tk_";

/// Random hex characters after the prefix.
const CLIENT_ID_SUFFIX_LEN: usize = 16;

/// Random bytes per secret before encoding.
const SECRET_ENTROPY_BYTES: usize = 32;

const HEX_ALPHABET: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

const CLIENT_COLUMNS: &str =
    "id, client_id, client_secret, user_id, is_active, created_at, last_used_at, expires_at";

/// Repository for OAuth2 client credential operations.
#[derive(Debug, Clone)]
pub struct OAuth2ClientRepository {
    pool: SqlitePool,
}

impl OAuth2ClientRepository {
    /// Create a new client credential repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new record ID.
    fn generate_id() -> String {
        format!("cli_{}", nanoid::nanoid!(12))
    }

    /// Generate a public client identifier.
    fn generate_client_id() -> String {
        format!(
            "{CLIENT_ID_PREFIX}{}",
            nanoid::nanoid!(CLIENT_ID_SUFFIX_LEN, &HEX_ALPHABET)
        )
    }

    /// Generate a client secret.
    fn generate_client_secret() -> String {
        let mut bytes = [0u8; SECRET_ENTROPY_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Provision a new client credential pair for an identity.
    #[instrument(skip(self))]
    pub async fn provision(&self, user_id: &str) -> Result<OAuth2Client, AuthError> {
        let id = Self::generate_id();
        let client_id = Self::generate_client_id();
        let client_secret = Self::generate_client_secret();

        debug!("Provisioning OAuth2 client {} for user {}", client_id, user_id);

        sqlx::query(
            r#"
            INSERT INTO oauth2_clients (id, client_id, client_secret, user_id)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&client_id)
        .bind(&client_secret)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to insert OAuth2 client")?;

        self.get(&id)
            .await?
            .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("OAuth2 client not found after provisioning")))
    }

    /// Get a client record by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<OAuth2Client>, AuthError> {
        let client = sqlx::query_as::<_, OAuth2Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM oauth2_clients WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch OAuth2 client")?;

        Ok(client)
    }

    /// Authenticate a client id/secret pair against an active, unexpired
    /// record. Updates the last-used stamp on success.
    #[instrument(skip(self, client_secret))]
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Option<OAuth2Client>, AuthError> {
        let client = sqlx::query_as::<_, OAuth2Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM oauth2_clients
            WHERE client_id = ?
              AND client_secret = ?
              AND is_active = 1
              AND (expires_at IS NULL OR expires_at > datetime('now'))
            "#
        ))
        .bind(client_id)
        .bind(client_secret)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to authenticate OAuth2 client")?;

        if let Some(client) = &client {
            sqlx::query("UPDATE oauth2_clients SET last_used_at = datetime('now') WHERE id = ?")
                .bind(&client.id)
                .execute(&self.pool)
                .await
                .context("Failed to update OAuth2 client last-used stamp")?;
        }

        Ok(client)
    }

    /// List an identity's active client credentials, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<OAuth2Client>, AuthError> {
        let clients = sqlx::query_as::<_, OAuth2Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM oauth2_clients
            WHERE user_id = ? AND is_active = 1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list OAuth2 clients")?;

        Ok(clients)
    }

    /// Deactivate a client credential. The record is kept for audit.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: &str) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE oauth2_clients SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to deactivate OAuth2 client")?;

        if result.rows_affected() == 0 {
            return Err(AuthError::validation("Client not found"));
        }

        Ok(())
    }
}
