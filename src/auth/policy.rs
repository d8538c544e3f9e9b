//! Role hierarchy and active-account gating.

use super::AuthError;
use crate::user::{Role, User};

/// Check whether an identity may exercise a capability requiring `required`.
///
/// An inactive account is denied everything, independent of role. A role
/// satisfies the requirement when its rank is at least the required rank.
///
/// Pure function: callers own the audit logging of denials.
pub fn authorize(user: &User, required: Role) -> Result<(), AuthError> {
    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    if user.role.rank() < required.rank() {
        return Err(AuthError::InsufficientRole);
    }

    Ok(())
}
