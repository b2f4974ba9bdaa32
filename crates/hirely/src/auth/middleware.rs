//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::Duration;
use log::{debug, warn};
use std::sync::Arc;

use super::{
    AuthConfig, AuthError, Claims, ConfigValidationError, Credential, CredentialCodec,
    CredentialError, DevUser, Identity, RevocationList, Role, SessionTransport,
};

/// Authentication state shared across handlers.
#[derive(Debug, Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    codec: CredentialCodec,
    transport: SessionTransport,
    revocations: RevocationList,
}

impl AuthState {
    /// Create new auth state from config.
    ///
    /// Validates the config and resolves `env:VAR_NAME` syntax in
    /// `jwt_secret`; a server must not start without a usable key.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigValidationError> {
        let secret = config.validate()?;
        let codec = CredentialCodec::new(secret.as_bytes());
        let transport = SessionTransport::new(config.cookie_name.clone(), !config.dev_mode);

        Ok(Self {
            config: Arc::new(config),
            codec,
            transport,
            revocations: RevocationList::new(),
        })
    }

    /// Check if dev mode is enabled.
    pub fn is_dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// Get dev users.
    pub fn dev_users(&self) -> &[DevUser] {
        &self.config.dev_users
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Credential lifetime.
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.config.token_ttl_secs)
    }

    pub fn transport(&self) -> &SessionTransport {
        &self.transport
    }

    pub fn revocations(&self) -> &RevocationList {
        &self.revocations
    }

    /// Issue a credential for a freshly authenticated identity.
    pub fn issue(&self, identity: &Identity) -> Result<Credential, AuthError> {
        Ok(self.codec.issue(identity, self.token_ttl())?)
    }

    /// Verify a raw token and resolve the caller.
    pub fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = match self.codec.verify_claims(token) {
            Ok(claims) => claims,
            Err(CredentialError::Internal(msg)) => return Err(AuthError::Internal(msg)),
            Err(err) => {
                warn!("credential rejected: {}", err);
                return Err(AuthError::InvalidCredential(err));
            }
        };

        if self.revocations.is_revoked(&claims.jti) {
            debug!("revoked credential presented for {}", claims.sub);
            return Err(AuthError::Revoked);
        }

        Ok(CurrentUser::from_claims(claims))
    }

    /// Revoke a credential until it expires.
    pub fn revoke(&self, claims: &Claims) {
        self.revocations.revoke(&claims.jti, claims.exp);
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    identity: Identity,
    /// Verified claims of the presented credential.
    pub claims: Claims,
}

impl CurrentUser {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            identity: claims.identity(),
            claims,
        }
    }

    /// Get the user ID.
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    /// Get the user's role.
    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Extract authentication from request.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::NotAuthenticated)
    }
}

/// Access guard.
///
/// Reads the session artifact (cookie first, then `Authorization: Bearer`),
/// verifies it and injects `CurrentUser` into request extensions. The
/// handler only runs when verification succeeds.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = auth.transport().extract(req.headers()) else {
        debug!("no session artifact on {}", req.uri().path());
        return Err(AuthError::NotAuthenticated);
    };

    let user = auth.authenticate(&token)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
