//! Profile handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::user::{UpdateProfileRequest, UserInfo};

/// Get the caller's profile.
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserInfo>> {
    let account = state.users.get_user(user.id()).await?;
    Ok(Json(account.into()))
}

/// Update the caller's profile.
///
/// Email and role are not editable here.
#[instrument(skip(state, user, payload), fields(user_id = %user.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<UserInfo>> {
    let Json(request) = payload?;
    let account = state.users.update_profile(user.id(), &request).await?;
    Ok(Json(account.into()))
}
