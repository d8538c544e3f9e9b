//! Identity data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role.
///
/// A closed set with an explicit numeric ranking; higher ranks satisfy
/// lower requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Basic,
    Premium,
    Admin,
}

impl Role {
    /// Numeric rank: basic(1) < premium(2) < admin(3).
    pub fn rank(&self) -> u8 {
        match self {
            Role::Basic => 1,
            Role::Premium => 2,
            Role::Admin => 3,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Basic => write!(f, "basic"),
            Role::Premium => write!(f, "premium"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Role::Basic),
            "premium" => Ok(Role::Premium),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl sqlx::Type<sqlx::Sqlite> for Role {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = self.to_string();
        <String as sqlx::Encode<sqlx::Sqlite>>::encode(s, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Role {
    fn decode(
        value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

/// Identity entity from the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

/// Public identity info (safe to return to clients).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Request to create a new identity.
///
/// `password` carries the plaintext on the way into the service layer and
/// the bcrypt hash on the way into the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

/// Request to update an existing identity.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Identity list query parameters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Basic.to_string(), "basic");
        assert_eq!(Role::Premium.to_string(), "premium");
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("basic".parse::<Role>().unwrap(), Role::Basic);
        assert_eq!("premium".parse::<Role>().unwrap(), Role::Premium);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_ranking_is_total_order() {
        assert!(Role::Basic.rank() < Role::Premium.rank());
        assert!(Role::Premium.rank() < Role::Admin.rank());
    }

    #[test]
    fn test_user_info_redacts_hash() {
        let user = User {
            id: "usr_test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "$2b$12$secret-hash".to_string(),
            full_name: Some("Test User".to_string()),
            role: Role::Basic,
            is_active: true,
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: "2026-01-01 00:00:00".to_string(),
            last_login_at: None,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));

        let info: UserInfo = user.into();
        assert_eq!(info.email, "test@example.com");
    }
}
