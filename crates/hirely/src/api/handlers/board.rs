//! Role-scoped job board entry points.
//!
//! Jobs and applications live in other services; these endpoints only pin
//! down who may ask for which list.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{CurrentUser, RequireRecruiter, Role};

/// A list scoped to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedListing {
    pub success: bool,
    pub user_id: String,
    pub role: Role,
    pub items: Vec<serde_json::Value>,
}

impl ScopedListing {
    fn empty_for(user: &CurrentUser) -> Self {
        Self {
            success: true,
            user_id: user.id().to_string(),
            role: user.role(),
            items: Vec::new(),
        }
    }
}

/// Applications submitted by the calling seeker.
///
/// Mounted behind a seeker-only `role_gate`.
pub async fn list_applications(user: CurrentUser) -> Json<ScopedListing> {
    debug!(user_id = %user.id(), "listing applications");
    Json(ScopedListing::empty_for(&user))
}

/// Jobs posted by the calling recruiter.
pub async fn list_posted_jobs(RequireRecruiter(user): RequireRecruiter) -> Json<ScopedListing> {
    debug!(user_id = %user.id(), "listing posted jobs");
    Json(ScopedListing::empty_for(&user))
}
