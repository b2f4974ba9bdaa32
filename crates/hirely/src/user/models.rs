//! User data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::{Identity, Role};

impl sqlx::Type<sqlx::Sqlite> for Role {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        let s = self.to_string();
        <String as sqlx::Encode<sqlx::Sqlite>>::encode(s, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Role {
    fn decode(
        value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

/// User entity from database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub role: Role,
    pub bio: Option<String>,
    /// JSON array of skill names.
    pub skills: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id.clone(), self.role)
    }

    pub fn skill_list(&self) -> Vec<String> {
        serde_json::from_str(&self.skills).unwrap_or_default()
    }
}

/// Public user info (safe to return to clients).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl UserInfo {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id.clone(), self.role)
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        let skills = user.skill_list();
        Self {
            id: user.id,
            fullname: user.fullname,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role,
            bio: user.bio,
            skills,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

/// Signup form.
///
/// `role` stays a string so an unknown value becomes a field error rather
/// than a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupRequest {
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub role: String,
    /// Avatar URL. Uploads are handled elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
}

/// Body of every `/auth/*` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

impl AuthResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "usr_1".to_string(),
            fullname: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone_number: "0123456789".to_string(),
            password_hash: "secret".to_string(),
            role: Role::Recruiter,
            bio: None,
            skills: r#"["rust","sql"]"#.to_string(),
            avatar_url: None,
            created_at: "2024-01-01".to_string(),
            updated_at: "2024-01-01".to_string(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_user_info_from_user() {
        let info = UserInfo::from(user());
        assert_eq!(info.id, "usr_1");
        assert_eq!(info.skills, vec!["rust", "sql"]);
        assert_eq!(info.identity(), Identity::new("usr_1", Role::Recruiter));
    }

    #[test]
    fn test_user_info_never_exposes_password() {
        let json = serde_json::to_value(UserInfo::from(user())).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["phoneNumber"], "0123456789");
        assert_eq!(json["role"], "recruiter");
    }

    #[test]
    fn test_signup_request_wire_names() {
        let request: SignupRequest = serde_json::from_str(
            r#"{"fullname":"A","email":"a@b.co","phoneNumber":"0123456789","password":"pw","role":"seeker"}"#,
        )
        .unwrap();
        assert_eq!(request.phone_number, "0123456789");
        assert!(request.avatar.is_none());

        // Missing fields default to empty so validation can report them.
        let request: SignupRequest = serde_json::from_str("{}").unwrap();
        assert!(request.email.is_empty());
    }

    #[test]
    fn test_corrupt_skills_column_reads_as_empty() {
        let mut user = user();
        user.skills = "not json".to_string();
        assert!(user.skill_list().is_empty());
    }
}
