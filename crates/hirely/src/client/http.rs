//! HTTP client for the auth endpoints.
//!
//! Keeps the session cookie in its own cookie store and drives the identity
//! store transitions: login and signup bracket an auth attempt, logout and
//! every 401 clear the identity.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::store::IdentityStore;
use crate::user::validate::{validate_login, validate_signup};
use crate::user::{AuthResponse, FieldErrors, LoginRequest, SignupRequest, UserInfo};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Form rejected before sending.
    #[error("invalid form: {0}")]
    Validation(FieldErrors),

    /// Another login or signup is in flight.
    #[error("another sign-in is already in progress")]
    Busy,

    /// Signup was attempted while signed in.
    #[error("already signed in; log out before creating an account")]
    AlreadySignedIn,

    /// Server answered with an error status.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
        errors: Option<FieldErrors>,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    message: String,
    code: Option<String>,
    errors: Option<FieldErrors>,
}

/// Auth-aware API client.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    store: IdentityStore,
}

impl AuthClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>, store: IdentityStore) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register an account.
    ///
    /// Only for signed-out clients: the attempt ends without an identity,
    /// so it is refused while someone is signed in.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ClientError> {
        validate_signup(request).map_err(ClientError::Validation)?;
        if self.store.snapshot().is_authenticated() {
            return Err(ClientError::AlreadySignedIn);
        }
        let pending = self.store.try_begin_auth().ok_or(ClientError::Busy)?;

        let result = self
            .send::<AuthResponse>(self.http.post(self.url("/auth/signup")).json(request))
            .await;

        // No credential is issued at signup.
        pending.fail();
        result
    }

    /// Log in; on success the store holds the confirmed identity.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<UserInfo, ClientError> {
        validate_login(request).map_err(ClientError::Validation)?;
        let pending = self.store.try_begin_auth().ok_or(ClientError::Busy)?;

        let response = match self
            .send::<AuthResponse>(self.http.post(self.url("/auth/login")).json(request))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                pending.fail();
                return Err(err);
            }
        };

        match response.user {
            Some(user) => {
                info!(user_id = %user.id, role = %user.role, "signed in");
                pending.succeed(user.identity());
                Ok(user)
            }
            None => {
                pending.fail();
                Err(ClientError::Api {
                    status: StatusCode::OK,
                    message: "login response carried no user".to_string(),
                    code: None,
                    errors: None,
                })
            }
        }
    }

    /// Log out. The local identity is cleared even if the request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<AuthResponse, ClientError> {
        let result = self
            .send::<AuthResponse>(self.http.post(self.url("/auth/logout")))
            .await;
        self.store.clear_identity();
        result
    }

    /// Ask the server who holds the current cookie and sync the store.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<Option<UserInfo>, ClientError> {
        match self.get_json::<AuthResponse>("/auth/me").await {
            Ok(response) => {
                if let Some(user) = &response.user {
                    self.store.set_identity(user.identity());
                }
                Ok(response.user)
            }
            Err(err) if err.is_unauthorized() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// GET a protected JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http.get(self.url(path))).await
    }

    /// PUT a JSON body to a protected resource.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.put(self.url(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        if status == StatusCode::UNAUTHORIZED {
            debug!("server answered 401; clearing identity");
            self.store.clear_identity();
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
            message: text,
            ..Default::default()
        });

        Err(ClientError::Api {
            status,
            message: body.message,
            code: body.code,
            errors: body.errors,
        })
    }
}
