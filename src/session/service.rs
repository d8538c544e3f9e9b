//! Session orchestration.
//!
//! Ties the credential hasher, token codec, refresh token store, and
//! client credential issuer together for the login, refresh, logout, and
//! authorization flows.

use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use crate::auth::{self, AccessTokenCodec, AuthConfig, AuthError, ConfigValidationError};
use crate::client::{OAuth2Client, OAuth2ClientRepository};
use crate::token::{RefreshTokenInfo, RefreshTokenRepository};
use crate::user::{CreateUserRequest, Role, User, UserRepository, UserService};

use super::models::TokenPair;

/// Orchestrates the authentication and session flows.
#[derive(Debug, Clone)]
pub struct SessionService {
    users: UserService,
    tokens: RefreshTokenRepository,
    clients: OAuth2ClientRepository,
    codec: AccessTokenCodec,
}

impl SessionService {
    /// Build the service over a database pool.
    ///
    /// Validates the config first: a missing, short, or placeholder signing
    /// secret is a fatal construction error, so a process cannot come up
    /// with a weak codec.
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;

        Ok(Self {
            users: UserService::new(UserRepository::new(pool.clone())),
            tokens: RefreshTokenRepository::new(pool.clone()),
            clients: OAuth2ClientRepository::new(pool),
            codec: AccessTokenCodec::new(config),
        })
    }

    /// The identity service backing this orchestrator.
    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// The client credential issuer backing this orchestrator.
    pub fn clients(&self) -> &OAuth2ClientRepository {
        &self.clients
    }

    /// Register a new identity and auto-provision its machine credentials.
    ///
    /// The provisioned client id/secret are not returned here; owners fetch
    /// them through [`Self::list_client_credentials`].
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<User, AuthError> {
        let user = self
            .users
            .create_user(CreateUserRequest {
                email: email.to_string(),
                password: password.to_string(),
                full_name,
                role: None,
            })
            .await?;

        let client = self.clients.provision(&user.id).await?;
        info!(user_id = %user.id, client_id = %client.client_id, "User registered");

        Ok(user)
    }

    /// Log in with an email/password pair.
    ///
    /// Unknown email and wrong password resolve to the same generic error.
    #[instrument(skip(self, email, password, device_info))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let user = self
            .users
            .verify_credentials(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let pair = self.issue_pair(&user.id, device_info).await?;

        // Opportunistic cleanup; login is the only place expiry sweeping runs.
        let swept = self.tokens.sweep().await?;
        if swept > 0 {
            debug!(count = swept, "Swept expired refresh tokens");
        }

        info!(user_id = %user.id, "Login successful");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair, rotating it.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let outcome = self.tokens.redeem(refresh_token).await?;

        // The rotated record is gone for good; the identity must still be a
        // live account to get a new pair.
        let user = self
            .users
            .get_user(&outcome.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidToken)?;

        let access_token = self.codec.mint(&user.id)?;

        info!(user_id = %user.id, "Token refreshed");
        Ok(TokenPair::new(
            access_token,
            outcome.replacement.token,
            self.codec.ttl_secs(),
        ))
    }

    /// Log out one session by revoking its refresh token.
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.tokens.revoke(refresh_token).await
    }

    /// Log out everywhere. Returns the number of sessions invalidated.
    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: &str) -> Result<u64, AuthError> {
        let count = self.tokens.revoke_all(user_id).await?;
        info!(user_id = %user_id, count, "Logged out of all sessions");
        Ok(count)
    }

    /// List the calling identity's active sessions. Token strings are
    /// never included.
    #[instrument(skip(self))]
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<RefreshTokenInfo>, AuthError> {
        let tokens = self.tokens.list_active(user_id).await?;
        Ok(tokens.into_iter().map(RefreshTokenInfo::from).collect())
    }

    /// Revoke one of the calling identity's sessions by record id.
    #[instrument(skip(self))]
    pub async fn revoke_session(&self, user_id: &str, token_id: &str) -> Result<(), AuthError> {
        self.tokens.revoke_by_id(user_id, token_id).await?;
        info!(user_id = %user_id, token_id = %token_id, "Session revoked");
        Ok(())
    }

    /// List the calling identity's machine credentials.
    #[instrument(skip(self))]
    pub async fn list_client_credentials(
        &self,
        user_id: &str,
    ) -> Result<Vec<OAuth2Client>, AuthError> {
        self.clients.list_for_user(user_id).await
    }

    /// Log in with OAuth2 client credentials.
    ///
    /// An alternate entry point into the same session machinery: a
    /// successful exchange yields a full access+refresh pair, exactly as a
    /// password login would.
    #[instrument(skip(self, client_id, client_secret))]
    pub async fn client_credentials_login(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenPair, AuthError> {
        let client = self
            .clients
            .authenticate(client_id, client_secret)
            .await?
            .ok_or_else(|| {
                warn!("OAuth2 client authentication failed");
                AuthError::InvalidClientCredentials
            })?;

        let user = self
            .users
            .get_user(&client.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidClientCredentials)?;

        let pair = self.issue_pair(&user.id, None).await?;

        info!(user_id = %user.id, client_id = %client.client_id, "OAuth2 token issued");
        Ok(pair)
    }

    /// Authorize a bearer token against a required role.
    ///
    /// Verifies the access token, resolves the identity, and applies the
    /// role/active policy. Returns the identity on success.
    #[instrument(skip(self, bearer_token))]
    pub async fn authorize(&self, bearer_token: &str, required: Role) -> Result<User, AuthError> {
        let claims = self.codec.verify(bearer_token)?;

        let user = self
            .users
            .get_user(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if let Err(denial) = auth::authorize(&user, required) {
            warn!(user_id = %user.id, required = %required, "Authorization denied");
            return Err(denial);
        }

        Ok(user)
    }

    /// Mint an access token and issue a refresh token as one pair.
    async fn issue_pair(
        &self,
        user_id: &str,
        device_info: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let access_token = self.codec.mint(user_id)?;
        let refresh = self.tokens.issue(user_id, device_info).await?;

        Ok(TokenPair::new(
            access_token,
            refresh.token,
            self.codec.ttl_secs(),
        ))
    }
}
