//! User accounts: signup, login checks and profile management.

mod models;
mod repository;
mod service;
pub mod validate;

pub use models::{
    AuthResponse, LoginRequest, SignupRequest, UpdateProfileRequest, User, UserInfo,
};
pub use repository::UserRepository;
pub use service::{UserError, UserService, UserStats, hash_password};
pub use validate::FieldErrors;
