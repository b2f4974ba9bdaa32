//! API request handlers.
//!
//! - `auth`: signup, login, logout and session introspection
//! - `profile`: the caller's own profile
//! - `board`: role-scoped entry points of the job board
//! - `misc`: health check

mod auth;
mod board;
mod misc;
mod profile;

pub use auth::{login, logout, me, signup};
pub use board::{ScopedListing, list_applications, list_posted_jobs};
pub use misc::{HealthResponse, health};
pub use profile::{get_profile, update_profile};
