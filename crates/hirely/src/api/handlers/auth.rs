//! Authentication handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, instrument};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::user::{AuthResponse, LoginRequest, SignupRequest, UserInfo};

/// Revoke the credential carried by `headers`, if it still verifies.
///
/// Returns whether anything was revoked.
fn revoke_presented(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(token) = state.auth.transport().extract(headers) else {
        return false;
    };
    match state.auth.authenticate(&token) {
        Ok(previous) => {
            state.auth.revoke(&previous.claims);
            true
        }
        Err(err) => {
            debug!(error = %err, "presented credential not revocable");
            false
        }
    }
}

/// Register a new account. Does not open a session.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(request) = payload?;
    let user = state.users.signup(&request).await?;

    info!(user_id = %user.id, role = %user.role, "User registered successfully");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::ok("Account created successfully.")),
    ))
}

/// Log in and attach a fresh session credential.
///
/// A credential already carried by the request is revoked, so a browser
/// holds at most one live session.
#[instrument(skip(state, headers, payload))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let user = state.users.login(&request).await?;

    let credential = state.auth.issue(&user.identity())?;
    if revoke_presented(&state, &headers) {
        debug!(user_id = %user.id, "replaced previous session");
    }

    let message = format!("Welcome back {}", user.fullname);
    let info = UserInfo::from(user);
    info!(user_id = %info.id, role = %info.role, "User logged in successfully");

    let mut response = Json(AuthResponse::ok(message).with_user(info)).into_response();
    state.auth.transport().attach(&mut response, &credential)?;

    Ok(response)
}

/// Log out: revoke the presented credential and clear the cookie.
///
/// Succeeds without a session so that clients can always reset.
#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if revoke_presented(&state, &headers) {
        info!("User logged out");
    }

    let mut response = Json(AuthResponse::ok("Logged out successfully.")).into_response();
    state.auth.transport().clear(&mut response)?;

    Ok(response)
}

/// Describe the caller's session.
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<AuthResponse>> {
    let account = state.users.get_user(user.id()).await?;
    Ok(Json(
        AuthResponse::ok("Session is active.").with_user(account.into()),
    ))
}
