//! Password hashing with bcrypt.

use super::AuthError;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum password length in bytes (bcrypt input limit).
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Bcrypt cost factor. Lower in debug builds for test speed.
fn cost() -> u32 {
    if cfg!(debug_assertions) {
        4
    } else {
        bcrypt::DEFAULT_COST
    }
}

/// Validate a plaintext password against the length policy.
///
/// Passwords outside the 8-character / 72-byte window are rejected rather
/// than truncated, so hash and verify always see the same bytes.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordPolicy(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::PasswordPolicy(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    Ok(())
}

/// Hash a password with bcrypt.
///
/// A hashing failure is a hard error; there is no fallback scheme.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;

    bcrypt::hash(password, cost())
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("bcrypt hash failed: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    // Out-of-window passwords can never have produced a stored hash.
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }

    bcrypt::verify(password, hash)
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("bcrypt verify failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("password123", &a).unwrap());
        assert!(verify_password("password123", &b).unwrap());
    }

    #[test]
    fn test_hash_output_is_bcrypt() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_rejects_short_password() {
        let err = hash_password("seven77").unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));
    }

    #[test]
    fn test_rejects_over_long_password() {
        let long = "x".repeat(MAX_PASSWORD_BYTES + 1);
        let err = hash_password(&long).unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));
    }

    #[test]
    fn test_boundary_lengths_accepted() {
        let min = "a".repeat(MIN_PASSWORD_LEN);
        let max = "b".repeat(MAX_PASSWORD_BYTES);

        let min_hash = hash_password(&min).unwrap();
        let max_hash = hash_password(&max).unwrap();

        assert!(verify_password(&min, &min_hash).unwrap());
        assert!(verify_password(&max, &max_hash).unwrap());
    }

    #[test]
    fn test_multibyte_password_measured_in_bytes() {
        // 25 four-byte scalars = 100 bytes, over the limit despite being
        // only 25 characters.
        let emoji = "🦀".repeat(25);
        assert!(hash_password(&emoji).is_err());

        // 16 scalars = 64 bytes, inside the window.
        let short_emoji = "🦀".repeat(16);
        let hash = hash_password(&short_emoji).unwrap();
        assert!(verify_password(&short_emoji, &hash).unwrap());
    }

    #[test]
    fn test_verify_over_long_is_false_not_error() {
        let hash = hash_password("password123").unwrap();
        let long = "x".repeat(MAX_PASSWORD_BYTES + 1);
        assert!(!verify_password(&long, &hash).unwrap());
    }
}
