//! Session orchestration module.
//!
//! The facade the routing layer calls into: login, refresh, logout,
//! session visibility, client-credential exchange, and bearer
//! authorization.

mod models;
mod service;

pub use models::TokenPair;
pub use service::SessionService;
