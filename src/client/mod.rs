//! OAuth2 client credential module.
//!
//! Static per-identity id/secret pairs for machine clients. Authenticating
//! with them enters the same session machinery as a password login.

mod models;
mod repository;

pub use models::OAuth2Client;
pub use repository::OAuth2ClientRepository;
