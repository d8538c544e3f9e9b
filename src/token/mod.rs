//! Refresh token module.
//!
//! Persisted, revocable opaque tokens with single-use rotation.

mod models;
mod repository;

pub use models::{RedeemOutcome, RefreshToken, RefreshTokenInfo};
pub use repository::RefreshTokenRepository;
