//! User service for account logic.

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::models::{LoginRequest, SignupRequest, UpdateProfileRequest, User};
use super::repository::{UserRepository, is_unique_violation};
use super::validate::{FieldErrors, validate_login, validate_profile_update, validate_signup};
use crate::auth::{DevUser, Role};

/// Account errors.
#[derive(Debug, Error)]
pub enum UserError {
    /// One or more form fields are invalid.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("User already exists with this email")]
    EmailTaken,

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// Password matched but the account holds a different role.
    #[error("Account doesn't exist with current role")]
    RoleMismatch,

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Service for account operations.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    /// Create a new user service.
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    /// Register a new account. No session is opened.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, UserError> {
        let account = validate_signup(request).map_err(UserError::Validation)?;

        if !self.repo.is_email_available(&account.email).await? {
            debug!("signup with registered email");
            return Err(UserError::EmailTaken);
        }

        let password_hash = hash_password(&account.password)?;
        let user = match self.repo.create(&account, &password_hash).await {
            Ok(user) => user,
            // Lost a race with a concurrent signup.
            Err(e) if is_unique_violation(&e) => return Err(UserError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, role = %user.role, "Created new user");
        Ok(user)
    }

    /// Check login credentials and the requested role.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<User, UserError> {
        let attempt = validate_login(request).map_err(UserError::Validation)?;

        let Some(user) = self.repo.get_by_email(&attempt.email).await? else {
            debug!("login for unknown email");
            return Err(UserError::InvalidCredentials);
        };

        if !verify_password(&attempt.password, &user.password_hash)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(UserError::InvalidCredentials);
        }

        if user.role != attempt.role {
            debug!(user_id = %user.id, requested = %attempt.role, "login with wrong role");
            return Err(UserError::RoleMismatch);
        }

        self.repo.update_last_login(&user.id).await?;
        info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(user)
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<User, UserError> {
        self.repo.get(id).await?.ok_or(UserError::NotFound)
    }

    /// Update the caller's own profile.
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<User, UserError> {
        let changes = validate_profile_update(request).map_err(UserError::Validation)?;
        let user = self
            .repo
            .update_profile(id, &changes)
            .await?
            .ok_or(UserError::NotFound)?;

        info!(user_id = %user.id, "Updated profile");
        Ok(user)
    }

    /// Insert configured development users that do not exist yet.
    ///
    /// Returns the number of accounts created.
    #[instrument(skip(self, users), fields(count = users.len()))]
    pub async fn seed_dev_users(&self, users: &[DevUser]) -> Result<usize, UserError> {
        let mut created = 0;

        for dev in users {
            let request = SignupRequest {
                fullname: dev.fullname.clone(),
                email: dev.email.clone(),
                phone_number: dev.phone_number.clone(),
                // Placeholder that satisfies validation; the stored hash comes from config.
                password: "dev-user".to_string(),
                role: dev.role.to_string(),
                avatar: None,
            };
            let account = validate_signup(&request).map_err(UserError::Validation)?;

            if !self.repo.is_email_available(&account.email).await? {
                debug!(email = %account.email, "dev user already present");
                continue;
            }

            let user = self.repo.create(&account, &dev.password_hash).await?;
            info!(user_id = %user.id, email = %user.email, role = %user.role, "Seeded dev user");
            created += 1;
        }

        Ok(created)
    }

    /// Get user statistics.
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<UserStats, UserError> {
        let seekers = self.repo.count_by_role(Role::Seeker).await?;
        let recruiters = self.repo.count_by_role(Role::Recruiter).await?;

        Ok(UserStats {
            total: seekers + recruiters,
            seekers,
            recruiters,
        })
    }
}

/// User statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserStats {
    pub total: i64,
    pub seekers: i64,
    pub recruiters: i64,
}

/// Hash a password using bcrypt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    // Use a lower cost factor for development speed
    let cost = if cfg!(debug_assertions) { 4 } else { 10 };
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Verify a password against a bcrypt hash.
fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn service() -> UserService {
        let db = Database::in_memory().await.unwrap();
        UserService::new(UserRepository::new(db.pool().clone()))
    }

    fn signup(email: &str, role: &str) -> SignupRequest {
        SignupRequest {
            fullname: "Test User".into(),
            email: email.into(),
            phone_number: "0123456789".into(),
            password: "secret1".into(),
            role: role.into(),
            avatar: None,
        }
    }

    fn login(email: &str, password: &str, role: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_signup_stores_hash_not_password() {
        let service = service().await;
        let user = service.signup(&signup("A@Example.com", "seeker")).await.unwrap();

        assert_eq!(user.email, "a@example.com");
        assert_ne!(user.password_hash, "secret1");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicates_and_invalid_forms() {
        let service = service().await;
        service.signup(&signup("a@example.com", "seeker")).await.unwrap();

        let err = service
            .signup(&signup("a@example.com", "recruiter"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));

        let err = service.signup(&signup("bad", "seeker")).await.unwrap_err();
        match err {
            UserError::Validation(errors) => assert!(errors.get("email").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let service = service().await;
        let created = service
            .signup(&signup("r@example.com", "recruiter"))
            .await
            .unwrap();

        let user = service
            .login(&login("R@example.com", "secret1", "recruiter"))
            .await
            .unwrap();
        assert_eq!(user.id, created.id);
        assert!(service.get_user(&user.id).await.unwrap().last_login_at.is_some());

        assert!(matches!(
            service.login(&login("r@example.com", "wrong-pw", "recruiter")).await,
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login(&login("x@example.com", "secret1", "recruiter")).await,
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login(&login("r@example.com", "secret1", "seeker")).await,
            Err(UserError::RoleMismatch)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_of_missing_user() {
        let service = service().await;
        let request = UpdateProfileRequest {
            bio: Some("hi".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile("usr_missing", &request).await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_seed_dev_users_is_idempotent() {
        let service = service().await;
        let users = vec![DevUser {
            fullname: "Dev Seeker".into(),
            email: "dev@localhost.test".into(),
            phone_number: "0123456789".into(),
            password_hash: hash_password("devpassword").unwrap(),
            role: Role::Seeker,
        }];

        assert_eq!(service.seed_dev_users(&users).await.unwrap(), 1);
        assert_eq!(service.seed_dev_users(&users).await.unwrap(), 0);

        let user = service
            .login(&login("dev@localhost.test", "devpassword", "seeker"))
            .await
            .unwrap();
        assert_eq!(user.fullname, "Dev Seeker");

        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.seekers, 1);
    }
}
