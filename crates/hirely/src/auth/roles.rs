//! Role gate: authorization by declared role sets.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::{AuthError, CurrentUser, Identity, Role};

/// Set of roles allowed to reach an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet {
    seeker: bool,
    recruiter: bool,
}

impl RoleSet {
    /// Empty set; nobody is allowed.
    pub const fn none() -> Self {
        Self {
            seeker: false,
            recruiter: false,
        }
    }

    /// Every role.
    pub const fn any() -> Self {
        Self {
            seeker: true,
            recruiter: true,
        }
    }

    /// Exactly one role.
    pub const fn only(role: Role) -> Self {
        Self::none().with(role)
    }

    pub const fn with(mut self, role: Role) -> Self {
        match role {
            Role::Seeker => self.seeker = true,
            Role::Recruiter => self.recruiter = true,
        }
        self
    }

    pub const fn contains(&self, role: Role) -> bool {
        match role {
            Role::Seeker => self.seeker,
            Role::Recruiter => self.recruiter,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.seeker && !self.recruiter
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::none(), RoleSet::with)
    }
}

impl std::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("no role");
        }
        let names: Vec<&str> = self.iter().map(|role| role.as_str()).collect();
        f.write_str(&names.join(" or "))
    }
}

/// Decide whether `identity` may perform an operation requiring `required`.
pub fn authorize(identity: &Identity, required: RoleSet) -> Result<(), AuthError> {
    if required.contains(identity.role) {
        Ok(())
    } else {
        debug!(user_id = %identity.id, role = %identity.role, %required, "role gate denied");
        Err(AuthError::InsufficientRole { required })
    }
}

/// Role gate middleware.
///
/// Must be layered inside `auth_middleware`; reads the identity the access
/// guard attached and never modifies the request.
pub async fn role_gate(
    State(required): State<RoleSet>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    admit(&req, required)?;
    Ok(next.run(req).await)
}

/// Check the identity the access guard attached to `req`.
///
/// Takes the request by reference: a denial leaves it untouched.
fn admit(req: &Request, required: RoleSet) -> Result<(), AuthError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthError::NotAuthenticated)?;
    authorize(user.identity(), required)
}

fn require(parts: &Parts, required: RoleSet) -> Result<CurrentUser, AuthError> {
    let user = parts
        .extensions
        .get::<CurrentUser>()
        .cloned()
        .ok_or(AuthError::NotAuthenticated)?;
    authorize(user.identity(), required)?;
    Ok(user)
}

/// Require the seeker role.
///
/// Use as an extractor in handlers that only job seekers may call.
#[derive(Debug, Clone)]
pub struct RequireSeeker(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireSeeker
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, RoleSet::only(Role::Seeker)).map(RequireSeeker)
    }
}

/// Require the recruiter role.
#[derive(Debug, Clone)]
pub struct RequireRecruiter(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireRecruiter
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require(parts, RoleSet::only(Role::Recruiter)).map(RequireRecruiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, AuthState, auth_middleware};
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-for-unit-tests-minimum-32-chars-long";

    fn current_user(role: Role) -> CurrentUser {
        let auth = AuthState::new(AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..AuthConfig::default()
        })
        .unwrap();
        let credential = auth.issue(&Identity::new("usr_1", role)).unwrap();
        CurrentUser::from_claims(credential.claims)
    }

    #[test]
    fn test_role_set_membership() {
        let seekers = RoleSet::only(Role::Seeker);
        assert!(seekers.contains(Role::Seeker));
        assert!(!seekers.contains(Role::Recruiter));

        assert!(RoleSet::any().contains(Role::Recruiter));
        assert!(RoleSet::none().is_empty());

        let collected: RoleSet = [Role::Recruiter, Role::Seeker].into_iter().collect();
        assert_eq!(collected, RoleSet::any());
    }

    #[test]
    fn test_role_set_display() {
        assert_eq!(RoleSet::only(Role::Seeker).to_string(), "seeker");
        assert_eq!(RoleSet::any().to_string(), "seeker or recruiter");
        assert_eq!(RoleSet::none().to_string(), "no role");
    }

    #[test]
    fn test_authorize_matrix() {
        let seeker = Identity::new("usr_a", Role::Seeker);
        let recruiter = Identity::new("usr_b", Role::Recruiter);

        assert!(authorize(&seeker, RoleSet::only(Role::Seeker)).is_ok());
        assert!(authorize(&recruiter, RoleSet::only(Role::Recruiter)).is_ok());
        assert!(authorize(&seeker, RoleSet::any()).is_ok());
        assert!(authorize(&recruiter, RoleSet::any()).is_ok());

        assert!(matches!(
            authorize(&recruiter, RoleSet::only(Role::Seeker)),
            Err(AuthError::InsufficientRole { .. })
        ));
        assert!(matches!(
            authorize(&seeker, RoleSet::only(Role::Recruiter)),
            Err(AuthError::InsufficientRole { .. })
        ));
        assert!(authorize(&seeker, RoleSet::none()).is_err());
    }

    #[test]
    fn test_denial_leaves_request_context_untouched() {
        let user = current_user(Role::Recruiter);
        let mut req = Request::new(Body::empty());
        req.extensions_mut().insert(user.clone());
        let before = req.extensions().len();

        let err = admit(&req, RoleSet::only(Role::Seeker)).unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole { .. }));

        assert_eq!(req.extensions().len(), before);
        let attached = req.extensions().get::<CurrentUser>().unwrap();
        assert_eq!(attached.identity(), user.identity());
        assert_eq!(attached.claims, user.claims);
    }

    #[test]
    fn test_gate_without_guard_is_unauthenticated() {
        let req = Request::new(Body::empty());
        assert!(matches!(
            admit(&req, RoleSet::any()),
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_denied_request_never_reaches_handler() {
        let auth = AuthState::new(AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..AuthConfig::default()
        })
        .unwrap();
        let credential = auth
            .issue(&Identity::new("usr_2", Role::Recruiter))
            .unwrap();

        let reached = Arc::new(AtomicBool::new(false));
        let flag = reached.clone();
        let app = Router::new()
            .route(
                "/applications",
                get(move || {
                    let flag = flag.clone();
                    async move {
                        flag.store(true, Ordering::SeqCst);
                        "ok"
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(
                RoleSet::only(Role::Seeker),
                role_gate,
            ))
            .route_layer(middleware::from_fn_with_state(auth, auth_middleware));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/applications")
                    .header(
                        axum::http::header::COOKIE,
                        format!("token={}", credential.token),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!reached.load(Ordering::SeqCst));
    }
}
