//! Application state shared across handlers.

use crate::auth::AuthState;
use crate::user::UserService;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Account service.
    pub users: UserService,
    /// Session pipeline: codec, transport and revocations.
    pub auth: AuthState,
}

impl AppState {
    pub fn new(users: UserService, auth: AuthState) -> Self {
        Self { users, auth }
    }
}
