use serde::{Deserialize, Serialize};

use super::repo_types::DEFAULT_THEME;
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Request body for `POST /auth/`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_verify: Option<String>,
}

/// A registration that passed every input check.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let (Some(email), Some(password), Some(password_verify)) = (
            non_empty(self.email),
            non_empty(self.password),
            non_empty(self.password_verify),
        ) else {
            return Err(ApiError::Validation("Please enter all required fields"));
        };

        if password.encode_utf16().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::Validation(
                "Please enter a password of at least 6 characters",
            ));
        }

        if password != password_verify {
            return Err(ApiError::Validation("Please enter the same password twice"));
        }

        Ok(Registration { email, password })
    }
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ApiError> {
        match (non_empty(self.email), non_empty(self.password)) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            _ => Err(ApiError::Validation("Please enter all required fields")),
        }
    }
}

/// Request body for `PUT /auth/theme`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeRequest {
    pub theme_name: Option<String>,
}

impl ThemeRequest {
    pub fn theme(self) -> String {
        non_empty(self.theme_name).unwrap_or_else(|| DEFAULT_THEME.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
