//! Turnkey
//!
//! Authentication and session-token core for a CRM backend: password
//! hashing, access/refresh token issuance with single-use rotation,
//! OAuth2 client-credential exchange, and role-based authorization.
//!
//! The HTTP layer is not part of this crate; frontends drive the
//! [`session::SessionService`] facade directly.

pub mod auth;
pub mod client;
pub mod db;
pub mod session;
pub mod token;
pub mod user;

pub use auth::{AuthConfig, AuthError, ErrorClass};
pub use db::Database;
pub use session::{SessionService, TokenPair};
pub use user::Role;
