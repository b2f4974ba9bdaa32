//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::RoleSet;

/// Outcome of a failed credential verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Token could not be parsed.
    #[error("malformed token")]
    Malformed,

    /// Signature does not match the payload.
    #[error("bad token signature")]
    BadSignature,

    /// Token is at or past its expiry.
    #[error("token expired")]
    Expired,

    /// Unexpected fault in the codec itself.
    #[error("credential codec failure: {0}")]
    Internal(String),
}

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session artifact on the request.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// Artifact present but the credential did not verify.
    #[error("Invalid token: {0}")]
    InvalidCredential(CredentialError),

    /// Credential was revoked by a logout.
    #[error("Session has been revoked")]
    Revoked,

    /// Authenticated, but the role is not allowed here.
    #[error("Not authorized: requires {required} role")]
    InsufficientRole { required: RoleSet },

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Internal(msg) => AuthError::Internal(msg),
            other => AuthError::InvalidCredential(other),
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotAuthenticated
            | AuthError::InvalidCredential(_)
            | AuthError::Revoked => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::InvalidCredential(CredentialError::Expired) => "token_expired",
            AuthError::InvalidCredential(_) => "invalid_token",
            AuthError::Revoked => "token_revoked",
            AuthError::InsufficientRole { .. } => "insufficient_role",
            AuthError::Internal(_) => "internal_error",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Internal details stay in the log.
        let message = match &self {
            AuthError::Internal(msg) => {
                error!(error_code = code, message = %msg, "authentication failure");
                "internal authentication error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(AuthErrorResponse {
            success: false,
            message,
            code,
        });

        (status, body).into_response()
    }
}
