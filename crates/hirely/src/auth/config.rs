//! Authentication configuration.

use serde::{Deserialize, Serialize};

use super::Role;
use super::transport::DEFAULT_COOKIE_NAME;

/// Minimum accepted length of the signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted credential lifetime (one year).
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Development mode: session cookies omit the `Secure` flag so that
    /// plain-http localhost works, and `dev_users` are seeded at startup.
    pub dev_mode: bool,

    /// HS256 signing secret, either literal or `env:VAR_NAME`.
    /// Required in every mode.
    pub jwt_secret: Option<String>,

    /// Credential lifetime in seconds.
    pub token_ttl_secs: i64,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Allowed CORS origins. Empty disables CORS.
    pub allowed_origins: Vec<String>,

    /// Development users (only seeded in dev mode).
    /// Passwords are stored as bcrypt hashes.
    pub dev_users: Vec<DevUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            // No default secret; it must be configured explicitly
            jwt_secret: None,
            token_ttl_secs: 60 * 60 * 24,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            dev_users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    /// Returns the resolved secret or None if not configured.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration and return the resolved signing secret.
    ///
    /// Any error here is fatal at startup; requests never see a missing key.
    pub fn validate(&self) -> Result<String, ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        if secret == "change-me" || secret == "your_secret_key_here" {
            return Err(ConfigValidationError::InsecureJwtSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.token_ttl_secs) {
            return Err(ConfigValidationError::InvalidTokenTtl(self.token_ttl_secs));
        }
        if self.cookie_name.is_empty()
            || !self
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigValidationError::InvalidCookieName(
                self.cookie_name.clone(),
            ));
        }

        Ok(secret)
    }

    /// Generate a secure random JWT secret.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// No signing secret configured.
    MissingJwtSecret,
    /// Signing secret is a well-known placeholder.
    InsecureJwtSecret,
    /// Signing secret is too short.
    JwtSecretTooShort,
    /// Token lifetime is not positive or exceeds `MAX_TOKEN_TTL_SECS`.
    InvalidTokenTtl(i64),
    /// Cookie name contains characters outside `[A-Za-z0-9_-]`.
    InvalidCookieName(String),
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingJwtSecret => write!(
                f,
                "JWT secret is required. Set HIRELY__AUTH__JWT_SECRET or auth.jwt_secret in config."
            ),
            Self::InsecureJwtSecret => write!(
                f,
                "JWT secret is a placeholder value. Please configure a secure secret."
            ),
            Self::JwtSecretTooShort => write!(
                f,
                "JWT secret must be at least {} characters long.",
                MIN_SECRET_LEN
            ),
            Self::InvalidTokenTtl(ttl) => {
                write!(
                    f,
                    "auth.token_ttl_secs must be between 1 and {} (got {}).",
                    MAX_TOKEN_TTL_SECS, ttl
                )
            }
            Self::InvalidCookieName(name) => write!(f, "invalid cookie name '{}'.", name),
            Self::EnvVarNotFound(var) => write!(
                f,
                "Environment variable '{}' not found (referenced via env:{} in config).",
                var, var
            ),
            Self::EnvVarEmpty(var) => write!(
                f,
                "Environment variable '{}' is empty (referenced via env:{} in config).",
                var, var
            ),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Development user configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevUser {
    /// Full name.
    pub fullname: String,
    /// Email address, used as the login.
    pub email: String,
    /// Ten-digit phone number.
    pub phone_number: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
    /// Role.
    pub role: Role,
}

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "a-very-long-and-secure-jwt-secret-that-is-at-least-32-chars";

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(!config.dev_mode);
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.token_ttl_secs, 86_400);
        assert_eq!(config.cookie_name, "token");
        assert!(config.dev_users.is_empty());
    }

    #[test]
    fn test_validation_requires_secret() {
        let config = AuthConfig::default();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::MissingJwtSecret
        );

        // Dev mode does not relax the requirement.
        let mut config = AuthConfig::default();
        config.dev_mode = true;
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::MissingJwtSecret
        );
    }

    #[test]
    fn test_validation_rejects_weak_secrets() {
        let mut config = AuthConfig::default();
        config.jwt_secret = Some("your_secret_key_here".to_string());
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::InsecureJwtSecret
        );

        config.jwt_secret = Some("tooshort".to_string());
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::JwtSecretTooShort
        );
    }

    #[test]
    fn test_validation_rejects_bad_ttl_and_cookie_name() {
        let mut config = AuthConfig::default();
        config.jwt_secret = Some(GOOD_SECRET.to_string());

        config.token_ttl_secs = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidTokenTtl(0)
        );

        config.token_ttl_secs = MAX_TOKEN_TTL_SECS + 1;
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidTokenTtl(MAX_TOKEN_TTL_SECS + 1)
        );

        // Large enough to overflow chrono's Duration.
        config.token_ttl_secs = i64::MAX;
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidTokenTtl(i64::MAX)
        );

        config.token_ttl_secs = MAX_TOKEN_TTL_SECS;
        assert!(config.validate().is_ok());

        config.token_ttl_secs = 60;
        config.cookie_name = "bad name;".to_string();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigValidationError::InvalidCookieName(_)
        ));
    }

    #[test]
    fn test_validation_returns_resolved_secret() {
        let mut config = AuthConfig::default();
        config.jwt_secret = Some(GOOD_SECRET.to_string());
        assert_eq!(config.validate().unwrap(), GOOD_SECRET);
    }

    #[test]
    fn test_generate_jwt_secret() {
        let secret = AuthConfig::generate_jwt_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, AuthConfig::generate_jwt_secret());

        let mut config = AuthConfig::default();
        config.jwt_secret = Some(secret);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_jwt_secret_env_var() {
        // SAFETY: test-only variable with a unique name
        unsafe {
            std::env::set_var(
                "HIRELY_TEST_JWT_SECRET_4821",
                "secret-from-env-var-at-least-32-chars",
            );
        }

        let mut config = AuthConfig::default();
        config.jwt_secret = Some("env:HIRELY_TEST_JWT_SECRET_4821".to_string());
        assert_eq!(
            config.resolve_jwt_secret().unwrap(),
            Some("secret-from-env-var-at-least-32-chars".to_string())
        );

        // SAFETY: cleaning up the variable set above
        unsafe {
            std::env::remove_var("HIRELY_TEST_JWT_SECRET_4821");
        }
    }

    #[test]
    fn test_resolve_jwt_secret_env_var_missing_or_empty() {
        let mut config = AuthConfig::default();
        config.jwt_secret = Some("env:HIRELY_MISSING_VAR_4821".to_string());
        assert_eq!(
            config.resolve_jwt_secret().unwrap_err(),
            ConfigValidationError::EnvVarNotFound("HIRELY_MISSING_VAR_4821".to_string())
        );

        // SAFETY: test-only variable with a unique name
        unsafe {
            std::env::set_var("HIRELY_EMPTY_VAR_4821", "");
        }
        config.jwt_secret = Some("env:HIRELY_EMPTY_VAR_4821".to_string());
        assert_eq!(
            config.resolve_jwt_secret().unwrap_err(),
            ConfigValidationError::EnvVarEmpty("HIRELY_EMPTY_VAR_4821".to_string())
        );
        // SAFETY: cleaning up the variable set above
        unsafe {
            std::env::remove_var("HIRELY_EMPTY_VAR_4821");
        }
    }
}
