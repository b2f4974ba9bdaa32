//! Credential claims, identities and user roles.

use serde::{Deserialize, Serialize};

/// Actor kind on the job board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Job seeker: browses and applies to jobs.
    Seeker,
    /// Recruiter: posts jobs and reviews applicants.
    Recruiter,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 2] = [Role::Seeker, Role::Recruiter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Seeker => "seeker",
            Role::Recruiter => "recruiter",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            // Older clients label seekers as students.
            "seeker" | "student" => Ok(Role::Seeker),
            "recruiter" => Ok(Role::Recruiter),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Resolved identity behind a valid credential.
///
/// Immutable for the lifetime of the credential it came from: a role change
/// only takes effect on the next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user ID.
    pub id: String,
    /// Role the session was opened with.
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_seeker(&self) -> bool {
        self.role == Role::Seeker
    }

    pub fn is_recruiter(&self) -> bool {
        self.role == Role::Recruiter
    }
}

/// Signed payload of a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Role the credential was issued for.
    pub role: Role,

    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,

    /// Expiration time (Unix timestamp, seconds).
    pub exp: i64,

    /// Token ID, used for revocation.
    pub jti: String,
}

impl Claims {
    /// Identity carried by these claims.
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone(), self.role)
    }

    /// Whether the claims are expired at `now`.
    ///
    /// A credential is only valid strictly before its expiry instant.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
