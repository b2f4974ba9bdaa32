//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use crate::auth::{Role, RoleSet, auth_middleware, role_gate};

use super::handlers;
use super::state::AppState;

/// Origins allowed in dev mode when none are configured.
const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.auth.allowed_origins(), state.auth.is_dev_mode());

    // Tracing layer with request IDs and timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Seeker-only routes; the role gate runs after the access guard.
    let seeker_routes = Router::new()
        .route("/api/applications", get(handlers::list_applications))
        .route_layer(middleware::from_fn_with_state(
            RoleSet::only(Role::Seeker),
            role_gate,
        ));

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::me))
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        // Recruiter-only through the `RequireRecruiter` extractor
        .route("/api/jobs/posted", get(handlers::list_posted_jobs))
        .merge(seeker_routes)
        .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer.
///
/// Credentials are allowed, so origins must be listed explicitly. With no
/// valid origins configured, cross-origin requests get no CORS headers.
fn build_cors_layer(allowed_origins: &[String], dev_mode: bool) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if dev_mode && origins.is_empty() {
        warn!("CORS: No origins configured, using default localhost origins for dev mode");
        origins.extend(DEV_ORIGINS.into_iter().map(HeaderValue::from_static));
    }

    if origins.is_empty() {
        warn!("CORS: No origins configured, denying all cross-origin requests");
        return CorsLayer::new();
    }

    info!("CORS: Allowing {} origin(s)", origins.len());
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::COOKIE,
        ])
        .allow_credentials(true)
}
