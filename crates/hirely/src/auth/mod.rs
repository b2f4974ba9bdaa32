//! Authentication module.
//!
//! Provides the session pipeline for the job board:
//! - Credential issue and verification (HS256, server-held secret)
//! - HTTP-only cookie transport with bearer fallback
//! - Access guard middleware and role gates
//! - Logout revocation

mod claims;
mod codec;
mod config;
mod error;
mod middleware;
mod revocation;
mod roles;
mod transport;

pub use claims::{Claims, Identity, Role};
pub use codec::{Credential, CredentialCodec};
pub use config::{
    AuthConfig, ConfigValidationError, DevUser, MAX_TOKEN_TTL_SECS, MIN_SECRET_LEN,
};
pub use error::{AuthError, AuthErrorResponse, CredentialError};
pub use middleware::{AuthState, CurrentUser, auth_middleware};
pub use revocation::RevocationList;
pub use roles::{RequireRecruiter, RequireSeeker, RoleSet, authorize, role_gate};
pub use transport::{DEFAULT_COOKIE_NAME, SessionTransport};
