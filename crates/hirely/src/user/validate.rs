//! Form validation shared by the server and the client.
//!
//! Messages are field-level and keyed by the wire name of the field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::models::{LoginRequest, SignupRequest, UpdateProfileRequest};
use crate::auth::Role;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const PHONE_DIGITS: usize = 10;
pub const MAX_BIO_LEN: usize = 1000;
pub const MAX_SKILLS: usize = 50;

/// Field name -> message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Validated signup data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

/// Validated login data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Validated profile changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub fullname: Option<String>,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.phone_number.is_none()
            && self.bio.is_none()
            && self.skills.is_none()
    }
}

/// Loose `x@y.z` check: no whitespace, a local part, and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Canonical form of an email address used for lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(errors: &mut FieldErrors, email: &str) -> String {
    let email = normalize_email(email);
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(&email) {
        errors.add("email", "Please enter a valid email address");
    }
    email
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password must be at least 6 characters");
    }
}

fn check_phone(errors: &mut FieldErrors, phone: &str) -> String {
    let phone = phone.trim().to_string();
    if phone.is_empty() {
        errors.add("phoneNumber", "Phone number is required");
    } else if !is_valid_phone(&phone) {
        errors.add("phoneNumber", "Please enter a valid 10-digit phone number");
    }
    phone
}

fn check_role(errors: &mut FieldErrors, role: &str) -> Option<Role> {
    if role.trim().is_empty() {
        errors.add("role", "Please select a role");
        return None;
    }
    match role.parse() {
        Ok(role) => Some(role),
        Err(_) => {
            errors.add("role", "Role must be seeker or recruiter");
            None
        }
    }
}

pub fn validate_signup(request: &SignupRequest) -> Result<NewAccount, FieldErrors> {
    let mut errors = FieldErrors::new();

    let fullname = request.fullname.trim().to_string();
    if fullname.is_empty() {
        errors.add("fullname", "Full name is required");
    }
    let email = check_email(&mut errors, &request.email);
    let phone_number = check_phone(&mut errors, &request.phone_number);
    check_password(&mut errors, &request.password);
    let role = check_role(&mut errors, &request.role);

    let avatar_url = request
        .avatar
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match role {
        Some(role) => errors.into_result(NewAccount {
            fullname,
            email,
            phone_number,
            password: request.password.clone(),
            role,
            avatar_url,
        }),
        None => Err(errors),
    }
}

pub fn validate_login(request: &LoginRequest) -> Result<LoginAttempt, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = check_email(&mut errors, &request.email);
    check_password(&mut errors, &request.password);
    let role = check_role(&mut errors, &request.role);

    match role {
        Some(role) => errors.into_result(LoginAttempt {
            email,
            password: request.password.clone(),
            role,
        }),
        None => Err(errors),
    }
}

pub fn validate_profile_update(
    request: &UpdateProfileRequest,
) -> Result<ProfileChanges, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut changes = ProfileChanges::default();

    if let Some(fullname) = &request.fullname {
        let fullname = fullname.trim();
        if fullname.is_empty() {
            errors.add("fullname", "Full name is required");
        }
        changes.fullname = Some(fullname.to_string());
    }

    if let Some(phone) = &request.phone_number {
        changes.phone_number = Some(check_phone(&mut errors, phone));
    }

    if let Some(bio) = &request.bio {
        if bio.chars().count() > MAX_BIO_LEN {
            errors.add("bio", format!("Bio must be at most {} characters", MAX_BIO_LEN));
        }
        changes.bio = Some(bio.trim().to_string());
    }

    if let Some(skills) = &request.skills {
        let skills: Vec<String> = skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if skills.len() > MAX_SKILLS {
            errors.add("skills", format!("At most {} skills are allowed", MAX_SKILLS));
        }
        changes.skills = Some(skills);
    }

    errors.into_result(changes)
}
