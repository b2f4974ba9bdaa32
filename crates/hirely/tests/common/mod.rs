//! Test utilities and common setup.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use hirely::api::{self, AppState};
use hirely::auth::{AuthConfig, AuthState};
use hirely::db::Database;
use hirely::user::{UserRepository, UserService};

/// Signing secret shared by every test app.
pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

pub const PASSWORD: &str = "secret123";

/// Create a test AuthConfig. Dev mode keeps the cookie usable over http.
fn test_auth_config() -> AuthConfig {
    AuthConfig {
        dev_mode: true,
        jwt_secret: Some(TEST_SECRET.to_string()),
        ..AuthConfig::default()
    }
}

/// Create a test application backed by an in-memory database.
pub async fn test_app() -> (Router, AuthState) {
    let db = Database::in_memory().await.unwrap();
    let auth_state = AuthState::new(test_auth_config()).unwrap();

    let user_service = UserService::new(UserRepository::new(db.pool().clone()));
    let state = AppState::new(user_service, auth_state.clone());

    (api::create_router(state), auth_state)
}

/// Serve a test application on an ephemeral port.
///
/// Returns the base URL.
pub async fn spawn_server() -> String {
    let (app, _) = test_app().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

pub fn signup_body(email: &str, role: &str) -> Value {
    json!({
        "fullname": "Test User",
        "email": email,
        "phoneNumber": "5551234567",
        "password": PASSWORD,
        "role": role,
    })
}

pub fn login_body(email: &str, role: &str) -> Value {
    json!({
        "email": email,
        "password": PASSWORD,
        "role": role,
    })
}

/// Send a request through the router.
///
/// `cookie` is a `name=value` pair as returned by [`session_cookie`].
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// The `name=value` part of the response's `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(';').next())
        .map(|pair| pair.trim().to_string())
}

/// Register an account and log it in; returns the session cookie.
pub async fn signup_and_login(app: &Router, email: &str, role: &str) -> String {
    let response = send(app, Method::POST, "/auth/signup", None, Some(signup_body(email, role))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(app, Method::POST, "/auth/login", None, Some(login_body(email, role))).await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response).expect("login sets the session cookie")
}
