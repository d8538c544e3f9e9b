//! Identity service for business logic.

use tracing::{info, instrument, warn};

use crate::auth::{self, AuthError, hash_password, verify_password};

use super::models::{CreateUserRequest, Role, UpdateUserRequest, User, UserListQuery};
use super::repository::UserRepository;

/// A well-formed bcrypt hash that matches no issued password. Verified on
/// the unknown-email path so response timing does not reveal whether an
/// email is registered.
const DUMMY_HASH: &str = "$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// Service for identity management operations.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    /// Create a new identity service.
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    /// Create a new identity with validation.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, AuthError> {
        if !is_valid_email(&request.email) {
            return Err(AuthError::validation("Invalid email format."));
        }

        if !self.repo.is_email_available(&request.email).await? {
            return Err(AuthError::validation("Email is already registered."));
        }

        let mut processed = request;
        processed.password = hash_password(&processed.password)?;

        let user = self.repo.create(processed).await?;
        info!(user_id = %user.id, "Created new user");

        Ok(user)
    }

    /// Get an identity by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AuthError> {
        Ok(self.repo.get(id).await?)
    }

    /// Get an identity by email.
    #[instrument(skip(self, email))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.repo.get_by_email(email).await?)
    }

    /// List identities with optional filters.
    #[instrument(skip(self))]
    pub async fn list_users(&self, query: UserListQuery) -> Result<Vec<User>, AuthError> {
        Ok(self.repo.list(query).await?)
    }

    /// Update an identity.
    ///
    /// Role and active-flag changes, and any change to another identity,
    /// require an admin actor. An admin may not deactivate their own
    /// account; that is a validation error, not a policy denial.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id))]
    pub async fn update_user(
        &self,
        actor: &User,
        id: &str,
        request: UpdateUserRequest,
    ) -> Result<User, AuthError> {
        let privileged = request.role.is_some() || request.is_active.is_some();

        if actor.id != id || privileged {
            auth::authorize(actor, Role::Admin)?;
        }

        if actor.id == id && request.is_active == Some(false) {
            warn!(user_id = %actor.id, "Refused self-deactivation");
            return Err(AuthError::validation("Cannot deactivate your own account"));
        }

        if self.repo.get(id).await?.is_none() {
            return Err(AuthError::validation("User not found"));
        }

        if let Some(email) = &request.email {
            if !is_valid_email(email) {
                return Err(AuthError::validation("Invalid email format."));
            }
            if let Some(existing) = self.repo.get_by_email(email).await?
                && existing.id != id
            {
                return Err(AuthError::validation("Email is already registered."));
            }
        }

        let mut processed = request;
        if let Some(password) = &processed.password {
            processed.password = Some(hash_password(password)?);
        }

        let user = self.repo.update(id, processed).await?;
        info!(user_id = %user.id, "Updated user");

        Ok(user)
    }

    /// Delete an identity. Admin only; self-deletion is refused.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_user(&self, actor: &User, id: &str) -> Result<(), AuthError> {
        auth::authorize(actor, Role::Admin)?;

        if actor.id == id {
            warn!(user_id = %actor.id, "Refused self-deletion");
            return Err(AuthError::validation("Cannot delete your own account"));
        }

        if self.repo.get(id).await?.is_none() {
            return Err(AuthError::validation("User not found"));
        }

        self.repo.delete(id).await?;
        info!(user_id = %id, "Deleted user");

        Ok(())
    }

    /// Verify an email/password pair.
    ///
    /// Returns the identity on success and updates its last-login stamp.
    /// Unknown email, wrong password, and inactive account all resolve to
    /// `None`; callers turn that into one generic credentials error.
    #[instrument(skip(self, email, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let user = self.repo.get_by_email(email).await?;

        match user {
            Some(user) if user.is_active => {
                if verify_password(password, &user.password_hash)? {
                    self.repo.update_last_login(&user.id).await?;
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            Some(_) => Ok(None),
            None => {
                // Equal hashing cost on the miss path.
                let _ = verify_password(password, DUMMY_HASH);
                Ok(None)
            }
        }
    }

    /// Change an identity's own password after re-verifying the current one.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .repo
            .get(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let hashed = hash_password(new_password)?;
        self.repo
            .update(
                user_id,
                UpdateUserRequest {
                    password: Some(hashed),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %user_id, "User changed their password");
        Ok(())
    }

    /// Get identity statistics.
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<UserStats, AuthError> {
        let total = self.repo.count().await?;
        let active = self.repo.count_active().await?;
        let basic = self.repo.count_by_role(Role::Basic).await?;
        let premium = self.repo.count_by_role(Role::Premium).await?;
        let admins = self.repo.count_by_role(Role::Admin).await?;

        Ok(UserStats {
            total,
            active,
            basic,
            premium,
            admins,
        })
    }
}

/// Identity statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub basic: i64,
    pub premium: i64,
    pub admins: i64,
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    !parts[0].is_empty() && parts[1].contains('.')
}
