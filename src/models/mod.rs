mod auth;
mod news;
mod prompt;
mod timestamp;
mod user;

pub use auth::{LoginRequest, Token};
pub use news::{Frequency, News, NewsCreate, NewsFilter};
pub use prompt::{
    NewsCount, Prompt, PromptCreate, PromptListParams, PromptTemplate, PromptUpdate,
    PromptWithStats, TemplateType, TemplateValidation, TemplateValidationResponse, Visibility,
};
pub use user::{User, UserCreate, UserSettings, UserUpdate};
