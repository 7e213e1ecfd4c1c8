use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

use super::timestamp;

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub news_generation_hour_1: Option<u8>,
    #[serde(default)]
    pub news_generation_hour_2: Option<u8>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Serialize)]
pub struct UserCreate {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_generation_hour_1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_generation_hour_2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

impl fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCreate")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl UserCreate {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            timezone: None,
            news_generation_hour_1: None,
            news_generation_hour_2: None,
            is_active: None,
            is_superuser: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_generation_hour_1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_generation_hour_2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

/// Schedule settings a user can change about themselves.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_generation_hour_1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_generation_hour_2: Option<u8>,
}

impl UserSettings {
    pub fn validate(&self) -> ApiResult<()> {
        for hour in [self.news_generation_hour_1, self.news_generation_hour_2]
            .into_iter()
            .flatten()
        {
            if hour > 23 {
                return Err(ApiError::validation(format!(
                    "Generation hour must be between 0 and 23, got {hour}"
                )));
            }
        }
        Ok(())
    }
}
