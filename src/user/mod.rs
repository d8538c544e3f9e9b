//! Identity management module.
//!
//! Provides the user store consumed by the session core: CRUD with
//! validation, credential verification, and role management.

mod models;
mod repository;
mod service;

pub use models::{CreateUserRequest, Role, UpdateUserRequest, User, UserInfo, UserListQuery};
pub use repository::UserRepository;
pub use service::{UserService, UserStats};
