//! Client route guard.
//!
//! Advisory only: the server re-checks every request.

use crate::auth::Role;

use super::store::IdentitySnapshot;

/// What a view needs before it may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    /// Anyone.
    Public,
    /// Signed-out users only (login and signup views).
    GuestOnly,
    /// Any signed-in user.
    AnyAuthenticated,
    /// A signed-in user with this role.
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    Redirect(String),
    /// A login is in flight; show a placeholder and decide again on change.
    Wait,
}

/// Maps snapshots and requirements to navigation decisions.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    home_path: String,
    not_authorized_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            not_authorized_path: "/".to_string(),
        }
    }
}

impl RouteGuard {
    pub fn new(
        login_path: impl Into<String>,
        home_path: impl Into<String>,
        not_authorized_path: impl Into<String>,
    ) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
            not_authorized_path: not_authorized_path.into(),
        }
    }

    pub fn decide(&self, snapshot: &IdentitySnapshot, requirement: RouteRequirement) -> RouteDecision {
        match (requirement, &snapshot.identity) {
            (RouteRequirement::Public, _) => RouteDecision::Render,

            (RouteRequirement::GuestOnly, Some(_)) => {
                RouteDecision::Redirect(self.home_path.clone())
            }
            (RouteRequirement::GuestOnly, None) => RouteDecision::Render,

            (RouteRequirement::AnyAuthenticated | RouteRequirement::Role(_), None) => {
                if snapshot.loading {
                    RouteDecision::Wait
                } else {
                    RouteDecision::Redirect(self.login_path.clone())
                }
            }

            (RouteRequirement::AnyAuthenticated, Some(_)) => RouteDecision::Render,

            (RouteRequirement::Role(required), Some(identity)) => {
                if identity.role == required {
                    RouteDecision::Render
                } else {
                    RouteDecision::Redirect(self.not_authorized_path.clone())
                }
            }
        }
    }
}
