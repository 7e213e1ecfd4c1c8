use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::Query;
use crate::error::{ApiError, ApiResult};

use super::timestamp;

/// Generation cadence of a news item.
///
/// `hourly` and `daily` are the canonical values. `30_minutes` only exists in
/// items generated before it was retired: it still decodes (with a warning) so
/// old feeds stay readable, but new generation requests refuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Frequency {
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "30_minutes")]
    ThirtyMinutes,
}

impl Frequency {
    /// Values accepted for new generation requests.
    pub const CANONICAL: [Frequency; 2] = [Frequency::Hourly, Frequency::Daily];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::ThirtyMinutes => "30_minutes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Hourly => "Hourly",
            Frequency::Daily => "Daily",
            Frequency::ThirtyMinutes => "30 minutes",
        }
    }

    pub fn is_deprecated(&self) -> bool {
        matches!(self, Frequency::ThirtyMinutes)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            "30_minutes" => Some(Frequency::ThirtyMinutes),
            _ => None,
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let frequency =
            Frequency::parse(&raw).ok_or_else(|| format!("unknown news frequency: {raw}"))?;
        if frequency.is_deprecated() {
            tracing::warn!("Decoded news item with deprecated frequency {}", raw);
        }
        Ok(frequency)
    }
}

/// Parses user input. Only canonical values are accepted.
impl FromStr for Frequency {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Frequency::parse(s) {
            Some(f) if !f.is_deprecated() => Ok(f),
            Some(_) => Err(ApiError::validation(format!(
                "Frequency {s} is deprecated; use hourly or daily"
            ))),
            None => Err(ApiError::validation(format!(
                "Unknown frequency {s}; use hourly or daily"
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub frequency: Frequency,
    pub prompt_id: i64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// Request to generate a news item for a prompt.
#[derive(Debug, Clone, Serialize)]
pub struct NewsCreate {
    pub prompt_id: i64,
    pub frequency: Frequency,
}

impl NewsCreate {
    pub fn new(prompt_id: i64, frequency: Frequency) -> ApiResult<Self> {
        if frequency.is_deprecated() {
            return Err(ApiError::validation(format!(
                "Frequency {frequency} is deprecated; use hourly or daily"
            )));
        }
        Ok(Self {
            prompt_id,
            frequency,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewsFilter {
    pub prompt_id: Option<i64>,
    pub frequency: Option<Frequency>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl NewsFilter {
    pub fn for_prompt(prompt_id: i64) -> Self {
        Self {
            prompt_id: Some(prompt_id),
            ..Default::default()
        }
    }

    pub fn to_query(&self) -> Query {
        Query::new()
            .opt_param("prompt_id", self.prompt_id)
            .opt_param("frequency", self.frequency)
            .opt_param("skip", self.skip)
            .opt_param("limit", self.limit)
    }
}
