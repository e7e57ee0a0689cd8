//! Users and their request shapes.

use super::errors::AuthError;
use super::password::PasswordHash;
use serde::{Deserialize, Serialize};

const MAX_FIELD_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: PasswordHash,
}

/// Public fields of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), AuthError> {
        require("username", &self.username)?;
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), AuthError> {
        if let Some(username) = &self.username {
            require("username", username)?;
        }
        if let Some(email) = &self.email {
            require("email", email)?;
        }
        if let Some(password) = &self.password {
            require("password", password)?;
        }
        Ok(())
    }
}

/// A `UserPatch` with the password already hashed, as the store receives it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredUserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<PasswordHash>,
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_FIELD_LEN {
        return Err(AuthError::Validation(format!(
            "{field} must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(())
}
