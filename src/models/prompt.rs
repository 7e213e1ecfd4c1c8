use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::Query;
use crate::error::{ApiError, ApiResult, AppError};

use super::timestamp;

const MAX_NAME_LEN: usize = 255;

/// Access tier of a prompt.
///
/// Deserializing any value other than the three below is an error: corrupted or
/// mis-migrated server data must surface instead of being mapped to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Private => "Private",
            Visibility::Internal => "Internal",
            Visibility::Public => "Public",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Visibility::Private => "Only you can see this",
            Visibility::Internal => "All signed-in users can see this",
            Visibility::Public => "Anyone with the link can see this",
        }
    }
}

impl FromStr for Visibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Visibility::Private),
            "internal" => Ok(Visibility::Internal),
            "public" => Ok(Visibility::Public),
            other => Err(AppError::InvalidVisibility(other.to_string())),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Summary,
    Analysis,
    BulletPoints,
    Narrative,
}

impl TemplateType {
    pub const ALL: [TemplateType; 4] = [
        TemplateType::Summary,
        TemplateType::Analysis,
        TemplateType::BulletPoints,
        TemplateType::Narrative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Summary => "summary",
            TemplateType::Analysis => "analysis",
            TemplateType::BulletPoints => "bullet_points",
            TemplateType::Narrative => "narrative",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemplateType::Summary => "Summary",
            TemplateType::Analysis => "Analysis",
            TemplateType::BulletPoints => "Bullet Points",
            TemplateType::Narrative => "Narrative",
        }
    }
}

impl FromStr for TemplateType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ApiError::validation(format!("Unknown template type: {s}")))
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of a prompt with the fields each kind requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptTemplate {
    Summary,
    Analysis,
    BulletPoints,
    Narrative { custom_template: String },
}

impl PromptTemplate {
    /// Builds a template from its wire parts.
    ///
    /// Narrative needs a non-blank custom template. The other kinds take none and
    /// a supplied one is dropped.
    pub fn from_parts(template_type: TemplateType, custom_template: Option<&str>) -> ApiResult<Self> {
        match template_type {
            TemplateType::Summary => Ok(PromptTemplate::Summary),
            TemplateType::Analysis => Ok(PromptTemplate::Analysis),
            TemplateType::BulletPoints => Ok(PromptTemplate::BulletPoints),
            TemplateType::Narrative => match custom_template.map(str::trim) {
                Some(t) if !t.is_empty() => Ok(PromptTemplate::Narrative {
                    custom_template: t.to_string(),
                }),
                _ => Err(ApiError::validation(
                    "Custom template is required for narrative template type",
                )),
            },
        }
    }

    pub fn template_type(&self) -> TemplateType {
        match self {
            PromptTemplate::Summary => TemplateType::Summary,
            PromptTemplate::Analysis => TemplateType::Analysis,
            PromptTemplate::BulletPoints => TemplateType::BulletPoints,
            PromptTemplate::Narrative { .. } => TemplateType::Narrative,
        }
    }

    pub fn custom_template(&self) -> Option<&str> {
        match self {
            PromptTemplate::Narrative { custom_template } => Some(custom_template),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub content: String,
    pub template_type: TemplateType,
    pub visibility: Visibility,
    #[serde(default)]
    pub custom_template: Option<String>,
    pub user_id: i64,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Prompt {
    pub fn template(&self) -> ApiResult<PromptTemplate> {
        PromptTemplate::from_parts(self.template_type, self.custom_template.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsCount {
    pub total: u64,
    #[serde(default)]
    pub hourly: u64,
    #[serde(default)]
    pub daily: u64,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptWithStats {
    #[serde(flatten)]
    pub prompt: Prompt,
    #[serde(default)]
    pub news_count: NewsCount,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptCreate {
    pub name: String,
    pub content: String,
    pub template_type: TemplateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_template: Option<String>,
    pub visibility: Visibility,
}

impl PromptCreate {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        template: PromptTemplate,
        visibility: Visibility,
    ) -> ApiResult<Self> {
        let name = name.into();
        let content = content.into();
        validate_name(&name)?;
        validate_content(&content)?;

        Ok(Self {
            name,
            content,
            template_type: template.template_type(),
            custom_template: template.custom_template().map(str::to_string),
            visibility,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_type: Option<TemplateType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl PromptUpdate {
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template_type = Some(template.template_type());
        self.custom_template = template.custom_template().map(str::to_string);
        self
    }

    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(content) = &self.content {
            validate_content(content)?;
        }
        if self.template_type == Some(TemplateType::Narrative) {
            if let Some(custom) = &self.custom_template {
                if custom.trim().is_empty() {
                    return Err(ApiError::validation(
                        "Custom template cannot be empty for narrative template type",
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.content.is_none()
            && self.template_type.is_none()
            && self.custom_template.is_none()
            && self.visibility.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptListParams {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

impl PromptListParams {
    pub fn to_query(&self) -> Query {
        Query::new()
            .opt_param("skip", self.skip)
            .opt_param("limit", self.limit)
            .opt_param("search", self.search.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateValidation {
    pub template_type: TemplateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_template: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateValidationResponse {
    pub valid: bool,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

fn validate_name(name: &str) -> ApiResult<()> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(ApiError::validation("Prompt name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Prompt name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> ApiResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::validation("Prompt content cannot be empty"));
    }
    Ok(())
}
